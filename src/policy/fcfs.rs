//! First-come-first-served baseline.

use super::{MergePolicy, FCFS};
use crate::conflict::ConflictModel;
use crate::error::Result;
use crate::schedule::MergeSchedule;
use crate::traffic::Traffic;

/// Merges vehicles in arrival order, ties broken by id.
///
/// No lookahead and no reordering across lanes. Each vehicle enters as soon
/// as it has arrived and the headway after its predecessor has elapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FcfsPolicy;

impl FcfsPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Vehicle ids in first-come-first-served order.
    pub fn order(traffic: &Traffic) -> Vec<usize> {
        // Traffic keeps its vehicles sorted by (arrival_time, id).
        traffic.vehicles().iter().map(|v| v.id()).collect()
    }
}

impl MergePolicy for FcfsPolicy {
    fn name(&self) -> &str {
        FCFS
    }

    fn schedule(&self, traffic: &Traffic, model: &ConflictModel) -> Result<MergeSchedule> {
        Ok(model.resolve(traffic, &Self::order(traffic))?)
    }
}
