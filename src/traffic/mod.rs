//! Multi-lane traffic.
//!
//! A [`Traffic`] instance is generated once per trial by a
//! [`TrafficGenerator`] and then shared read-only by every merge policy.

mod config;
mod generator;
mod types;

pub use config::TrafficConfig;
pub use generator::TrafficGenerator;
pub use types::{Traffic, Vehicle};
