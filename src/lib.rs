//! Merge scheduling for vehicles converging from several lanes onto one.
//!
//! Vehicles arrive on each lane as independent Poisson processes and must
//! pass a single merge point one at a time, separated by a minimum headway.
//! A merge policy decides the passing order and times; the goal is low
//! delay relative to arrival.
//!
//! - **Traffic**: Poisson arrival generation and the immutable instance type.
//! - **Conflict model**: the headway rule, a timing pass turning an order
//!   into a feasible schedule, and delay scoring with contract checks.
//! - **Policies**: first-come-first-served, an exact dynamic program over
//!   lane cursors, and simulated annealing over lane interleavings.
//! - **Experiments**: per-trial evaluation of every policy and a driver
//!   that fans independent trials out to a worker pool.
//!
//! # Example
//!
//! ```
//! use u_lanemerge::conflict::ConflictModel;
//! use u_lanemerge::policy::{DpPolicy, FcfsPolicy, MergePolicy};
//! use u_lanemerge::traffic::Traffic;
//!
//! let traffic = Traffic::from_lanes(&[vec![0.0, 0.5], vec![0.2]]).unwrap();
//! let model = ConflictModel::new(1.0).unwrap().with_lane_change_headway(3.0).unwrap();
//!
//! let fcfs = FcfsPolicy::new().schedule(&traffic, &model).unwrap();
//! let dp = DpPolicy::default().schedule(&traffic, &model).unwrap();
//!
//! let fcfs_delay = model.score(&traffic, &fcfs).unwrap().total_delay;
//! let dp_delay = model.score(&traffic, &dp).unwrap().total_delay;
//! assert!(dp_delay < fcfs_delay);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): runs policies and trials on a rayon pool.
//! - `serde`: serialization for configurations and trial records.
//!
//! Diagnostics are emitted as `tracing` events; no subscriber is installed.

pub mod conflict;
pub mod error;
pub mod experiment;
pub mod policy;
pub mod random;
pub mod schedule;
pub mod traffic;

pub use error::{Error, Result};
