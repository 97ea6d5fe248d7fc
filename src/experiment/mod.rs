//! Trials and experiments.
//!
//! A trial generates one traffic instance and runs every policy on it. An
//! experiment runs many independent trials, in parallel with the `parallel`
//! feature, and averages the per-policy delay features.

mod config;
mod driver;
mod report;
mod trial;

pub use config::{ExperimentConfig, TrialConfig};
pub use driver::ExperimentDriver;
pub use report::{ExperimentReport, Feature, PolicySummary, TrialFailure};
pub use trial::{TrialParameters, TrialRecord, TrialResult, TrialRunner};
