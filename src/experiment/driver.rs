//! Fan-out of independent trials and collection of their results.

use rand::Rng;

use super::config::ExperimentConfig;
use super::report::{ExperimentReport, TrialFailure};
use super::trial::{TrialResult, TrialRunner};
use crate::error::{Error, Result};
use crate::random::{create_rng, resolve_seed};

/// Runs a batch of trials and aggregates the results.
///
/// Trial seeds are drawn from the experiment seed before any trial starts,
/// so the report does not depend on the number of workers or the order in
/// which trials finish.
///
/// # Examples
///
/// ```
/// use u_lanemerge::experiment::{ExperimentConfig, ExperimentDriver, Feature, TrialConfig};
/// use u_lanemerge::policy::{AnnealingConfig, DP, FCFS};
/// use u_lanemerge::traffic::TrafficConfig;
///
/// let trial = TrialConfig::default()
///     .with_traffic(TrafficConfig::default().with_rate(0.4).with_horizon(10.0))
///     .with_lane_change_headway(2.0)
///     .with_annealing(AnnealingConfig::default().with_iterations(500));
/// let config = ExperimentConfig::default()
///     .with_trials(4)
///     .with_workers(2)
///     .with_seed(42)
///     .with_trial(trial);
///
/// let report = ExperimentDriver::new(config).unwrap().run().unwrap();
/// assert_eq!(report.trials.len(), 4);
///
/// let gain = report.relative_improvement(FCFS, DP, Feature::MeanDelay);
/// assert!(gain.map_or(true, |g| g >= -1e-9));
/// ```
#[derive(Debug, Clone)]
pub struct ExperimentDriver {
    config: ExperimentConfig,
    runner: TrialRunner,
}

impl ExperimentDriver {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        let runner = TrialRunner::new(config.trial.clone())?;
        Ok(Self { config, runner })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn runner(&self) -> &TrialRunner {
        &self.runner
    }

    /// Runs every trial.
    ///
    /// A failed trial is recorded in [`ExperimentReport::failures`] and does
    /// not stop the others. Only a worker pool that cannot be built is an
    /// error.
    pub fn run(&self) -> Result<ExperimentReport> {
        let seed = resolve_seed(self.config.seed);
        let mut rng = create_rng(seed);
        let jobs: Vec<(usize, u64)> = (0..self.config.trials)
            .map(|index| (index, rng.random()))
            .collect();

        tracing::info!(
            trials = self.config.trials,
            workers = self.config.workers,
            seed,
            "experiment started"
        );

        let mut outcomes = self.run_jobs(&jobs)?;
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = ExperimentReport {
            seed,
            trials: Vec::with_capacity(outcomes.len()),
            failures: Vec::new(),
        };
        for (index, trial_seed, outcome) in outcomes {
            match outcome {
                Ok(result) => report.trials.push(result),
                Err(error) => {
                    tracing::warn!(trial = index, seed = trial_seed, %error, "trial failed");
                    report.failures.push(TrialFailure {
                        index,
                        seed: trial_seed,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            completed = report.trials.len(),
            failed = report.failures.len(),
            "experiment finished"
        );
        Ok(report)
    }

    #[cfg(feature = "parallel")]
    fn run_jobs(&self, jobs: &[(usize, u64)]) -> Result<Vec<Outcome>> {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("worker pool: {e}")))?;

        Ok(pool.install(|| {
            jobs.par_iter()
                .map(|&(index, seed)| (index, seed, self.runner.run(index, seed)))
                .collect()
        }))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_jobs(&self, jobs: &[(usize, u64)]) -> Result<Vec<Outcome>> {
        Ok(jobs
            .iter()
            .map(|&(index, seed)| (index, seed, self.runner.run(index, seed)))
            .collect())
    }
}

type Outcome = (usize, u64, Result<TrialResult>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{Feature, TrialConfig};
    use crate::policy::{AnnealingConfig, DpConfig, DP, FCFS, SIMULATED_ANNEALING};
    use crate::traffic::TrafficConfig;

    fn config(trials: usize, workers: usize) -> ExperimentConfig {
        let trial = TrialConfig::default()
            .with_traffic(
                TrafficConfig::default()
                    .with_rate(0.4)
                    .with_horizon(10.0)
                    .with_max_per_lane(5),
            )
            .with_lane_change_headway(2.0)
            .with_annealing(AnnealingConfig::default().with_iterations(1_000));
        ExperimentConfig::default()
            .with_trials(trials)
            .with_workers(workers)
            .with_seed(2024)
            .with_trial(trial)
    }

    #[test]
    fn test_report_ordered_by_index() {
        let report = ExperimentDriver::new(config(6, 3)).unwrap().run().unwrap();
        assert_eq!(report.seed, 2024);
        assert!(report.is_complete());
        let indices: Vec<_> = report.trials.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let one = ExperimentDriver::new(config(5, 1)).unwrap().run().unwrap();
        let many = ExperimentDriver::new(config(5, 4)).unwrap().run().unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn test_trials_get_distinct_seeds() {
        let report = ExperimentDriver::new(config(8, 2)).unwrap().run().unwrap();
        let mut seeds: Vec<_> = report.trials.iter().map(|t| t.seed).collect();
        seeds.sort_unstable();
        seeds.dedup();
        assert_eq!(seeds.len(), 8);
    }

    #[test]
    fn test_zero_trials() {
        let report = ExperimentDriver::new(config(0, 2)).unwrap().run().unwrap();
        assert!(report.trials.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_dp_skips_are_per_trial() {
        let mut config = config(3, 2);
        config.trial = config.trial.with_dp(DpConfig::default().with_max_states(1));
        let report = ExperimentDriver::new(config).unwrap().run().unwrap();

        assert_eq!(report.trials.len(), 3);
        let summary = report.summary();
        assert!(summary.contains_key(FCFS));
        assert!(summary.contains_key(SIMULATED_ANNEALING));
        for trial in &report.trials {
            // Only an empty instance fits in a single state.
            if trial.traffic.is_empty() {
                assert!(trial.skipped.is_empty());
            } else {
                assert_eq!(trial.skipped, vec![DP.to_string()]);
            }
        }
    }

    #[test]
    fn test_dp_improves_on_fcfs_on_average() {
        let report = ExperimentDriver::new(config(6, 2)).unwrap().run().unwrap();
        let gain = report
            .relative_improvement(FCFS, DP, Feature::MeanDelay)
            .unwrap_or(0.0);
        assert!(gain >= -1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = config(2, 1).with_trial(TrialConfig::default().with_headway(f64::NAN));
        assert!(matches!(
            ExperimentDriver::new(bad),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_trial_record_shape() {
        let report = ExperimentDriver::new(config(1, 1)).unwrap().run().unwrap();
        let value = serde_json::to_value(&report.trials[0]).unwrap();

        for key in [
            "traffic", "methods", "mean_delay", "max_delay", "t_last", "lambda", "n", "w_e",
            "w_p",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["lambda"], 0.4);
        assert_eq!(value["n"], 5);
        assert_eq!(value["w_p"], 2.0);

        // Arrival and entry times are grouped per lane.
        let lanes = value["traffic"].as_array().unwrap();
        assert_eq!(lanes.len(), 2);
        for name in [FCFS, DP, SIMULATED_ANNEALING] {
            assert!(value["mean_delay"].get(name).is_some(), "missing {name}");
            let times = value["methods"][name].as_array().unwrap();
            assert_eq!(times.len(), 2);
            for (lane, entries) in times.iter().enumerate() {
                assert_eq!(
                    entries.as_array().unwrap().len(),
                    lanes[lane].as_array().unwrap().len()
                );
            }
        }
    }
}
