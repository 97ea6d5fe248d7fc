//! One traffic instance evaluated by every policy.

use std::collections::BTreeMap;

use rand::Rng;

use super::config::TrialConfig;
use super::report::Feature;
use crate::conflict::{ConflictModel, DelayMetrics};
use crate::error::{Error, Result};
use crate::policy::{
    AnnealingPolicy, DpPolicy, FcfsPolicy, MergePolicy, DP, FCFS, SIMULATED_ANNEALING,
};
use crate::random::create_rng;
use crate::schedule::MergeSchedule;
use crate::traffic::{Traffic, TrafficGenerator};

/// Settings a trial ran under, recorded with its results.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrialParameters {
    /// Arrival rate per lane.
    #[cfg_attr(feature = "serde", serde(rename = "lambda"))]
    pub rate: f64,
    pub horizon: f64,
    /// Per-lane vehicle cap.
    #[cfg_attr(feature = "serde", serde(rename = "n"))]
    pub max_per_lane: Option<usize>,
    /// Same-lane headway.
    #[cfg_attr(feature = "serde", serde(rename = "w_e"))]
    pub headway: f64,
    /// Cross-lane headway.
    #[cfg_attr(feature = "serde", serde(rename = "w_p"))]
    pub lane_change_headway: f64,
}

impl TrialParameters {
    fn new(config: &TrialConfig, model: &ConflictModel) -> Self {
        Self {
            rate: config.traffic.rate,
            horizon: config.traffic.horizon,
            max_per_lane: config.traffic.max_per_lane,
            headway: model.headway(),
            lane_change_headway: model.lane_change_headway(),
        }
    }
}

/// Outcome of one trial.
///
/// Every map is keyed by policy name. A policy listed in `skipped` has no
/// entry in any map. Serializes as its [`TrialRecord`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(into = "TrialRecord")
)]
pub struct TrialResult {
    /// Position of the trial within its experiment.
    pub index: usize,
    /// Seed the trial was generated from.
    pub seed: u64,
    pub parameters: TrialParameters,
    /// The generated instance.
    pub traffic: Traffic,
    /// Schedule produced by each policy.
    pub methods: BTreeMap<String, MergeSchedule>,
    pub mean_delay: BTreeMap<String, f64>,
    pub max_delay: BTreeMap<String, f64>,
    pub t_last: BTreeMap<String, f64>,
    /// Policies that declined the instance.
    pub skipped: Vec<String>,
}

impl TrialResult {
    /// Looks up one feature of one policy.
    pub fn metric(&self, policy: &str, feature: Feature) -> Option<f64> {
        let map = match feature {
            Feature::MeanDelay => &self.mean_delay,
            Feature::MaxDelay => &self.max_delay,
            Feature::TLast => &self.t_last,
        };
        map.get(policy).copied()
    }

    /// Names of the policies that produced a schedule.
    pub fn policies(&self) -> impl Iterator<Item = &str> + '_ {
        self.methods.keys().map(String::as_str)
    }

    /// The per-lane view of this trial written to result files.
    pub fn record(&self) -> TrialRecord {
        let lane_count = self.traffic.lane_count();
        TrialRecord {
            index: self.index,
            seed: self.seed,
            parameters: self.parameters,
            traffic: self.traffic.lane_arrival_times(),
            methods: self
                .methods
                .iter()
                .map(|(name, schedule)| (name.clone(), schedule.lane_times(lane_count)))
                .collect(),
            mean_delay: self.mean_delay.clone(),
            max_delay: self.max_delay.clone(),
            t_last: self.t_last.clone(),
            skipped: self.skipped.clone(),
        }
    }

    fn insert(&mut self, policy: &str, schedule: MergeSchedule, metrics: DelayMetrics) {
        self.methods.insert(policy.to_string(), schedule);
        self.mean_delay.insert(policy.to_string(), metrics.mean_delay);
        self.max_delay.insert(policy.to_string(), metrics.max_delay);
        self.t_last.insert(policy.to_string(), metrics.t_last);
    }
}

/// Flat record of one trial.
///
/// `traffic` holds arrival times per lane and `methods` the entry times
/// per lane for each policy, both in lane order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrialRecord {
    pub index: usize,
    pub seed: u64,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub parameters: TrialParameters,
    pub traffic: Vec<Vec<f64>>,
    pub methods: BTreeMap<String, Vec<Vec<f64>>>,
    pub mean_delay: BTreeMap<String, f64>,
    pub max_delay: BTreeMap<String, f64>,
    pub t_last: BTreeMap<String, f64>,
    pub skipped: Vec<String>,
}

impl From<TrialResult> for TrialRecord {
    fn from(result: TrialResult) -> Self {
        result.record()
    }
}

/// Runs FCFS, DP and annealing on one traffic instance.
///
/// The runner is immutable; one value serves every trial of an experiment.
///
/// # Examples
///
/// ```
/// use u_lanemerge::experiment::{TrialConfig, TrialRunner};
/// use u_lanemerge::policy::{AnnealingConfig, DP, FCFS};
/// use u_lanemerge::traffic::TrafficConfig;
///
/// let config = TrialConfig::default()
///     .with_traffic(TrafficConfig::default().with_rate(0.5).with_horizon(10.0))
///     .with_annealing(AnnealingConfig::default().with_iterations(500));
/// let runner = TrialRunner::new(config).unwrap();
///
/// let result = runner.run(0, 42).unwrap();
/// assert!(result.mean_delay[DP] <= result.mean_delay[FCFS] + 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct TrialRunner {
    config: TrialConfig,
    generator: TrafficGenerator,
    model: ConflictModel,
    dp: DpPolicy,
}

impl TrialRunner {
    pub fn new(config: TrialConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        let generator = TrafficGenerator::new(config.traffic.clone())?;
        let model = config.conflict_model()?;
        let dp = DpPolicy::new(config.dp.clone())?;
        Ok(Self {
            config,
            generator,
            model,
            dp,
        })
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn model(&self) -> &ConflictModel {
        &self.model
    }

    /// Generates traffic from `seed` and evaluates every policy on it.
    ///
    /// The annealing seed is drawn from the same stream after the traffic,
    /// so the whole trial is a function of `seed`.
    pub fn run(&self, index: usize, seed: u64) -> Result<TrialResult> {
        let mut rng = create_rng(seed);
        let traffic = self.generator.generate(&mut rng)?;
        let annealing_seed: u64 = rng.random();
        self.evaluate(index, seed, traffic, annealing_seed)
    }

    /// Evaluates every policy on a given instance.
    ///
    /// A schedule failing the conflict check fails the trial. DP over its
    /// state ceiling is skipped and listed in [`TrialResult::skipped`].
    pub fn evaluate(
        &self,
        index: usize,
        seed: u64,
        traffic: Traffic,
        annealing_seed: u64,
    ) -> Result<TrialResult> {
        let annealing =
            AnnealingPolicy::new(self.config.annealing.clone().with_seed(annealing_seed))?;
        let fcfs = FcfsPolicy::new();
        let policies: [&dyn MergePolicy; 3] = [&fcfs, &self.dp, &annealing];

        let outcomes = self.schedule_all(&policies, &traffic);

        let mut result = TrialResult {
            index,
            seed,
            parameters: TrialParameters::new(&self.config, &self.model),
            traffic,
            methods: BTreeMap::new(),
            mean_delay: BTreeMap::new(),
            max_delay: BTreeMap::new(),
            t_last: BTreeMap::new(),
            skipped: Vec::new(),
        };

        for (policy, outcome) in policies.iter().zip(outcomes) {
            let schedule = match outcome {
                Ok(schedule) => schedule,
                Err(Error::IntractableSize(e)) => {
                    tracing::warn!(trial = index, policy = policy.name(), %e, "policy skipped");
                    result.skipped.push(policy.name().to_string());
                    continue;
                }
                Err(e) => return Err(e),
            };
            let metrics = self.model.score(&result.traffic, &schedule)?;
            result.insert(policy.name(), schedule, metrics);
        }

        tracing::debug!(
            trial = index,
            vehicles = result.traffic.len(),
            fcfs = result.mean_delay.get(FCFS).copied(),
            dp = result.mean_delay.get(DP).copied(),
            annealing = result.mean_delay.get(SIMULATED_ANNEALING).copied(),
            "trial finished"
        );

        Ok(result)
    }

    #[cfg(feature = "parallel")]
    fn schedule_all(
        &self,
        policies: &[&dyn MergePolicy; 3],
        traffic: &Traffic,
    ) -> Vec<Result<MergeSchedule>> {
        if !self.config.parallel {
            return self.schedule_sequential(policies, traffic);
        }
        let model = &self.model;
        let [first, second, third] = *policies;
        let (a, (b, c)) = rayon::join(
            || first.schedule(traffic, model),
            || {
                rayon::join(
                    || second.schedule(traffic, model),
                    || third.schedule(traffic, model),
                )
            },
        );
        vec![a, b, c]
    }

    #[cfg(not(feature = "parallel"))]
    fn schedule_all(
        &self,
        policies: &[&dyn MergePolicy; 3],
        traffic: &Traffic,
    ) -> Vec<Result<MergeSchedule>> {
        self.schedule_sequential(policies, traffic)
    }

    fn schedule_sequential(
        &self,
        policies: &[&dyn MergePolicy; 3],
        traffic: &Traffic,
    ) -> Vec<Result<MergeSchedule>> {
        policies
            .iter()
            .map(|policy| policy.schedule(traffic, &self.model))
            .collect()
    }
}
