//! Aggregated experiment results.

use std::collections::BTreeMap;

use super::trial::TrialResult;
use crate::error::Error;

/// A per-policy quantity recorded for every trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Feature {
    MeanDelay,
    MaxDelay,
    TLast,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::MeanDelay, Feature::MaxDelay, Feature::TLast];

    /// Field name used in trial records.
    pub fn name(&self) -> &'static str {
        match self {
            Feature::MeanDelay => "mean_delay",
            Feature::MaxDelay => "max_delay",
            Feature::TLast => "t_last",
        }
    }
}

/// Averages of one policy's features over the trials it ran in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PolicySummary {
    /// Trials that produced a schedule for this policy.
    pub trials: usize,
    pub mean_delay: f64,
    pub max_delay: f64,
    pub t_last: f64,
}

impl PolicySummary {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::MeanDelay => self.mean_delay,
            Feature::MaxDelay => self.max_delay,
            Feature::TLast => self.t_last,
        }
    }
}

/// A trial that did not complete.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrialFailure {
    pub index: usize,
    pub seed: u64,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_error"))]
    pub error: Error,
}

#[cfg(feature = "serde")]
fn serialize_error<S: serde::Serializer>(error: &Error, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Results of an experiment, ordered by trial index.
///
/// Under the `serde` feature each trial serializes as its
/// [`TrialRecord`](super::TrialRecord).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExperimentReport {
    /// Seed every trial seed was derived from.
    pub seed: u64,
    /// Completed trials.
    pub trials: Vec<TrialResult>,
    /// Trials that failed, with the error that stopped them.
    pub failures: Vec<TrialFailure>,
}

impl ExperimentReport {
    /// Number of trials attempted.
    pub fn attempted(&self) -> usize {
        self.trials.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Per-policy averages across completed trials.
    ///
    /// A policy skipped in some trials is averaged over the others only.
    pub fn summary(&self) -> BTreeMap<String, PolicySummary> {
        let mut sums: BTreeMap<String, PolicySummary> = BTreeMap::new();
        for trial in &self.trials {
            for policy in trial.policies() {
                let entry = sums.entry(policy.to_string()).or_default();
                entry.trials += 1;
                entry.mean_delay += trial.metric(policy, Feature::MeanDelay).unwrap_or(0.0);
                entry.max_delay += trial.metric(policy, Feature::MaxDelay).unwrap_or(0.0);
                entry.t_last += trial.metric(policy, Feature::TLast).unwrap_or(0.0);
            }
        }
        for summary in sums.values_mut() {
            let n = summary.trials as f64;
            summary.mean_delay /= n;
            summary.max_delay /= n;
            summary.t_last /= n;
        }
        sums
    }

    /// Relative improvement `(baseline - candidate) / baseline` of the
    /// averaged feature.
    ///
    /// `None` when either policy has no data or the baseline average is zero.
    pub fn relative_improvement(
        &self,
        baseline: &str,
        candidate: &str,
        feature: Feature,
    ) -> Option<f64> {
        let summary = self.summary();
        let b = summary.get(baseline)?.get(feature);
        let c = summary.get(candidate)?.get(feature);
        if b == 0.0 {
            return None;
        }
        Some((b - c) / b)
    }

    /// The worst per-trial value of a feature for one policy.
    pub fn worst(&self, policy: &str, feature: Feature) -> Option<f64> {
        self.trials
            .iter()
            .filter_map(|t| t.metric(policy, feature))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}
