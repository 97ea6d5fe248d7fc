//! Merge policies.
//!
//! A policy turns a [`Traffic`] instance into a [`MergeSchedule`]. Three
//! policies are provided:
//!
//! - [`FcfsPolicy`]: arrival order, no reordering across lanes.
//! - [`DpPolicy`]: exact minimum-total-delay interleaving of the lanes.
//! - [`AnnealingPolicy`]: simulated annealing over lane interleavings, for
//!   instances too large for the exact search.
//!
//! DP and annealing only reorder vehicles across lanes; within a lane the
//! arrival order is always kept.

pub mod annealing;
pub mod dp;
mod fcfs;

pub use annealing::{AnnealingConfig, AnnealingPolicy, AnnealingResult, CoolingSchedule};
pub use dp::{DpConfig, DpPolicy, DpSolution};
pub use fcfs::FcfsPolicy;

use crate::conflict::ConflictModel;
use crate::error::Result;
use crate::schedule::MergeSchedule;
use crate::traffic::Traffic;

/// Report name of the first-come-first-served policy.
pub const FCFS: &str = "FCFS";
/// Report name of the exact dynamic program.
pub const DP: &str = "DP";
/// Report name of the simulated annealing policy.
pub const SIMULATED_ANNEALING: &str = "Simulation Annealing";

/// An algorithm producing a merge schedule from a traffic instance.
///
/// Implementations hold no mutable state, so one policy value can serve
/// concurrent trials.
pub trait MergePolicy: Send + Sync {
    /// Name used as the key in trial reports.
    fn name(&self) -> &str;

    /// Computes a merge schedule for `traffic` under `model`.
    fn schedule(&self, traffic: &Traffic, model: &ConflictModel) -> Result<MergeSchedule>;
}
