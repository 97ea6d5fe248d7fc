//! Simulated annealing over lane interleavings.
//!
//! A single-solution trajectory search that accepts worsening moves with a
//! probability that decreases over time (temperature), letting it escape
//! local optima that a greedy reordering would get stuck in. Used where the
//! exact DP table would be too large.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Lundy & Mees (1986), "Convergence of an Annealing Algorithm"

mod config;
mod runner;

pub use config::{AnnealingConfig, CoolingSchedule};
pub use runner::{AnnealingPolicy, AnnealingResult};
