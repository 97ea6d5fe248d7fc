//! Trial and experiment configuration.

use crate::conflict::ConflictModel;
use crate::error::Result;
use crate::policy::{AnnealingConfig, DpConfig};
use crate::traffic::TrafficConfig;

/// Everything needed to run one trial.
///
/// # Examples
///
/// ```
/// use u_lanemerge::experiment::TrialConfig;
/// use u_lanemerge::traffic::TrafficConfig;
///
/// let config = TrialConfig::default()
///     .with_traffic(TrafficConfig::default().with_rate(0.2).with_max_per_lane(100))
///     .with_headway(1.0)
///     .with_lane_change_headway(3.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialConfig {
    /// Traffic generation parameters.
    pub traffic: TrafficConfig,

    /// Minimum separation between consecutive vehicles.
    pub headway: f64,

    /// Separation between consecutive vehicles from different lanes.
    ///
    /// `None` applies `headway` to every pair.
    pub lane_change_headway: Option<f64>,

    /// Exact DP settings.
    pub dp: DpConfig,

    /// Annealing settings. The seed is replaced by a per-trial seed.
    pub annealing: AnnealingConfig,

    /// Whether the three policies of a trial may run on separate threads.
    ///
    /// Only takes effect with the `parallel` feature.
    pub parallel: bool,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            traffic: TrafficConfig::default(),
            headway: 1.0,
            lane_change_headway: None,
            dp: DpConfig::default(),
            annealing: AnnealingConfig::default(),
            parallel: true,
        }
    }
}

impl TrialConfig {
    pub fn with_traffic(mut self, traffic: TrafficConfig) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn with_headway(mut self, headway: f64) -> Self {
        self.headway = headway;
        self
    }

    pub fn with_lane_change_headway(mut self, headway: f64) -> Self {
        self.lane_change_headway = Some(headway);
        self
    }

    pub fn with_dp(mut self, dp: DpConfig) -> Self {
        self.dp = dp;
        self
    }

    pub fn with_annealing(mut self, annealing: AnnealingConfig) -> Self {
        self.annealing = annealing;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builds the conflict model described by the headway settings.
    pub fn conflict_model(&self) -> Result<ConflictModel> {
        let model = ConflictModel::new(self.headway)?;
        match self.lane_change_headway {
            Some(h) => model.with_lane_change_headway(h),
            None => Ok(model),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.traffic.validate()?;
        self.dp.validate()?;
        self.annealing.validate()?;
        self.conflict_model().map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Configuration for a batch of trials.
///
/// # Examples
///
/// ```
/// use u_lanemerge::experiment::ExperimentConfig;
///
/// let config = ExperimentConfig::default()
///     .with_trials(20)
///     .with_workers(4)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentConfig {
    /// Number of independent trials.
    pub trials: usize,

    /// Worker threads for running trials. 0 = one per CPU.
    ///
    /// Only takes effect with the `parallel` feature.
    pub workers: usize,

    /// Experiment seed; every trial seed is derived from it.
    pub seed: Option<u64>,

    /// Per-trial settings.
    pub trial: TrialConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            trials: 1,
            workers: 0,
            seed: None,
            trial: TrialConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn with_trials(mut self, n: usize) -> Self {
        self.trials = n;
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trial(mut self, trial: TrialConfig) -> Self {
        self.trial = trial;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.trial.validate()
    }
}
