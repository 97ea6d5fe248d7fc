//! Error types.
//!
//! Two failure classes matter to callers:
//!
//! - [`InvalidScheduleError`]: a policy produced a schedule that is not a
//!   permutation of the traffic or that breaks the headway constraint.
//!   This is always a defect in the policy and is fatal for the trial.
//! - [`IntractableSizeError`]: the exact DP declined an instance whose
//!   cursor-state space exceeds the configured ceiling. This is expected
//!   for large instances; callers skip DP for that trial.

use thiserror::Error;

/// Result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A schedule failed the conflict-model contract check.
    #[error(transparent)]
    InvalidSchedule(#[from] InvalidScheduleError),

    /// The exact DP state space is above its ceiling.
    #[error(transparent)]
    IntractableSize(#[from] IntractableSizeError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Traffic input violates its invariants.
    #[error("invalid traffic: {0}")]
    InvalidTraffic(String),
}

/// A merge schedule violated the conflict-model contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidScheduleError {
    /// The schedule length differs from the number of vehicles.
    #[error("schedule has {scheduled} entries but traffic has {expected} vehicles")]
    NotAPermutation { expected: usize, scheduled: usize },

    /// A vehicle appears more than once.
    #[error("vehicle {vehicle} scheduled more than once")]
    DuplicateVehicle { vehicle: usize },

    /// A vehicle id does not exist in the traffic instance.
    #[error("vehicle {vehicle} does not exist in the traffic instance")]
    UnknownVehicle { vehicle: usize },

    /// The lane recorded in the schedule disagrees with the vehicle's lane.
    #[error("vehicle {vehicle} is on lane {actual}, schedule says lane {scheduled}")]
    LaneMismatch {
        vehicle: usize,
        actual: usize,
        scheduled: usize,
    },

    /// A vehicle enters the merge point before it arrives.
    #[error("vehicle {vehicle} scheduled at {scheduled_time} before its arrival at {arrival_time}")]
    BeforeArrival {
        vehicle: usize,
        arrival_time: f64,
        scheduled_time: f64,
    },

    /// Two consecutive vehicles are closer than the required separation.
    #[error(
        "vehicles {previous} and {next} at position {position} are {gap} apart, need {required}"
    )]
    HeadwayViolation {
        position: usize,
        previous: usize,
        next: usize,
        gap: f64,
        required: f64,
    },
}

/// The exact DP declined an instance above its state-count ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("DP state space of {states} states exceeds the ceiling of {ceiling}")]
pub struct IntractableSizeError {
    /// Number of cursor states the instance would need (`usize::MAX` on overflow).
    pub states: usize,
    /// Configured ceiling.
    pub ceiling: usize,
}
