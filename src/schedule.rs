//! Merge schedules.

/// One vehicle's slot in a merge schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScheduledVehicle {
    /// Vehicle id.
    pub vehicle: usize,
    /// Lane the vehicle comes from.
    pub lane: usize,
    /// Time the vehicle enters the merge point.
    pub scheduled_time: f64,
}

/// A total order over the vehicles of a traffic instance, each with an
/// entry time at the merge point.
///
/// Entries are stored in merge order. Whether the order is a permutation of
/// the traffic and respects the headway constraint is checked by
/// [`ConflictModel::score`](crate::conflict::ConflictModel::score).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MergeSchedule {
    entries: Vec<ScheduledVehicle>,
}

impl MergeSchedule {
    pub fn new(entries: Vec<ScheduledVehicle>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ScheduledVehicle] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScheduledVehicle> {
        self.entries.iter()
    }

    /// Vehicle ids in merge order.
    pub fn order(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.vehicle).collect()
    }

    /// Time the merge point clears (0 for an empty schedule).
    pub fn t_last(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.scheduled_time)
            .fold(0.0, f64::max)
    }

    /// Scheduled times grouped by lane, each lane in merge order.
    pub fn lane_times(&self, lane_count: usize) -> Vec<Vec<f64>> {
        let mut lanes = vec![Vec::new(); lane_count];
        for e in &self.entries {
            if let Some(lane) = lanes.get_mut(e.lane) {
                lane.push(e.scheduled_time);
            }
        }
        lanes
    }
}

impl<'a> IntoIterator for &'a MergeSchedule {
    type Item = &'a ScheduledVehicle;
    type IntoIter = std::slice::Iter<'a, ScheduledVehicle>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
