//! Exact dynamic program over lane interleavings.
//!
//! A state is the tuple of per-lane cursors (how many vehicles of each lane
//! have already merged). Advancing one lane's cursor merges that lane's next
//! vehicle. The table is flat, indexed by the mixed-radix encoding of the
//! cursor tuple, so every transition moves to a strictly larger index and a
//! single ascending sweep visits states in dependency order.
//!
//! Each entry keeps the non-dominated `(last entry time, last lane, total
//! delay)` labels that reach it. Usually that is a single label; keeping
//! the full frontier makes the result exact when two prefixes reach the
//! same cursor tuple with different time/delay trade-offs.
//!
//! The state count `prod(lane_len + 1)` is polynomial for a fixed number of
//! lanes but exponential in the lane count; instances above
//! [`DpConfig::max_states`] are declined up front.

mod config;
mod solver;

pub use config::DpConfig;
pub use solver::{DpPolicy, DpSolution};
