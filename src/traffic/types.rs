//! Vehicles and traffic instances.

use crate::error::{Error, Result};

/// A vehicle arriving at the merge point.
///
/// Immutable once created. `id` is unique within its traffic instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Vehicle {
    id: usize,
    lane: usize,
    arrival_time: f64,
}

impl Vehicle {
    pub fn new(id: usize, lane: usize, arrival_time: f64) -> Self {
        Self {
            id,
            lane,
            arrival_time,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Earliest time the vehicle can enter the merge point.
    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }
}

/// One generated traffic instance, shared read-only by every policy.
///
/// Vehicles are held in `(arrival_time, id)` order. The instance can only be
/// built through validating constructors, so every `Traffic` value
/// satisfies:
///
/// - ids are dense (`0..len`) and unique,
/// - every lane index is below `lane_count`,
/// - arrival times are finite and non-negative,
/// - within a lane, arrival times strictly increase in id order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Traffic {
    lane_count: usize,
    vehicles: Vec<Vehicle>,
    #[cfg_attr(feature = "serde", serde(skip))]
    lanes: Vec<Vec<usize>>,
    #[cfg_attr(feature = "serde", serde(skip))]
    positions: Vec<usize>,
}

impl Traffic {
    /// Builds a traffic instance from vehicles in any order.
    pub fn new(lane_count: usize, mut vehicles: Vec<Vehicle>) -> Result<Self> {
        vehicles.sort_by_key(|v| v.id);

        let mut lanes: Vec<Vec<usize>> = vec![Vec::new(); lane_count];
        for (expected, v) in vehicles.iter().enumerate() {
            if v.id != expected {
                return Err(Error::InvalidTraffic(format!(
                    "vehicle ids must be dense and unique, expected {expected}, found {}",
                    v.id
                )));
            }
            if v.lane >= lane_count {
                return Err(Error::InvalidTraffic(format!(
                    "vehicle {} is on lane {} but there are only {lane_count} lanes",
                    v.id, v.lane
                )));
            }
            if !v.arrival_time.is_finite() || v.arrival_time < 0.0 {
                return Err(Error::InvalidTraffic(format!(
                    "vehicle {} has invalid arrival time {}",
                    v.id, v.arrival_time
                )));
            }
            let lane = &mut lanes[v.lane];
            if let Some(&prev) = lane.last() {
                let prev_arrival = vehicles[prev].arrival_time;
                if v.arrival_time <= prev_arrival {
                    return Err(Error::InvalidTraffic(format!(
                        "lane {} arrivals must strictly increase: \
                         vehicle {} at {} follows vehicle {prev} at {prev_arrival}",
                        v.lane, v.id, v.arrival_time
                    )));
                }
            }
            lane.push(v.id);
        }

        vehicles.sort_by(|a, b| {
            a.arrival_time
                .total_cmp(&b.arrival_time)
                .then(a.id.cmp(&b.id))
        });
        let mut positions = vec![0; vehicles.len()];
        for (pos, v) in vehicles.iter().enumerate() {
            positions[v.id] = pos;
        }

        Ok(Self {
            lane_count,
            vehicles,
            lanes,
            positions,
        })
    }

    /// Builds a traffic instance from per-lane arrival times.
    ///
    /// Ids are assigned lane by lane: lane 0 first, then lane 1, and so on.
    pub fn from_lanes(lanes: &[Vec<f64>]) -> Result<Self> {
        let mut vehicles = Vec::with_capacity(lanes.iter().map(Vec::len).sum());
        for (lane, arrivals) in lanes.iter().enumerate() {
            for &t in arrivals {
                vehicles.push(Vehicle::new(vehicles.len(), lane, t));
            }
        }
        Self::new(lanes.len(), vehicles)
    }

    /// A traffic instance with no vehicles.
    pub fn empty(lane_count: usize) -> Self {
        Self {
            lane_count,
            vehicles: Vec::new(),
            lanes: vec![Vec::new(); lane_count],
            positions: Vec::new(),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// All vehicles in `(arrival_time, id)` order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Looks up a vehicle by id.
    pub fn vehicle(&self, id: usize) -> Option<&Vehicle> {
        self.positions.get(id).map(|&pos| &self.vehicles[pos])
    }

    /// Vehicles of one lane in arrival order. Empty for an unknown lane.
    pub fn lane(&self, lane: usize) -> impl Iterator<Item = &Vehicle> + '_ {
        self.lanes
            .get(lane)
            .into_iter()
            .flatten()
            .map(move |&id| &self.vehicles[self.positions[id]])
    }

    /// Number of vehicles on each lane.
    pub fn lane_sizes(&self) -> Vec<usize> {
        self.lanes.iter().map(Vec::len).collect()
    }

    /// Arrival times grouped by lane.
    pub fn lane_arrival_times(&self) -> Vec<Vec<f64>> {
        (0..self.lane_count)
            .map(|l| self.lane(l).map(Vehicle::arrival_time).collect())
            .collect()
    }

    /// Sum of all arrival times.
    pub fn total_arrival_time(&self) -> f64 {
        self.vehicles.iter().map(|v| v.arrival_time).sum()
    }
}
