//! The merge-point safety constraint and delay scoring.
//!
//! Two vehicles occupying the merge point consecutively must be separated
//! by at least the headway. An optional lane-change headway applies when
//! the two vehicles come from different lanes; it defaults to the plain
//! headway, giving a single separation regardless of lane.

use crate::error::{Error, InvalidScheduleError, Result};
use crate::schedule::{MergeSchedule, ScheduledVehicle};
use crate::traffic::{Traffic, Vehicle};

/// Default slack when comparing floating-point times.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Delay statistics of one schedule against its traffic.
///
/// For an empty schedule every field is zero; `vehicles == 0` marks the
/// "no data" case.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DelayMetrics {
    /// Average of `scheduled_time - arrival_time`.
    pub mean_delay: f64,
    /// Largest single delay.
    pub max_delay: f64,
    /// Time the merge point clears.
    pub t_last: f64,
    /// Sum of all delays.
    pub total_delay: f64,
    /// Number of vehicles scored.
    pub vehicles: usize,
}

impl DelayMetrics {
    pub fn is_empty(&self) -> bool {
        self.vehicles == 0
    }
}

/// Headway constraint and schedule scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConflictModel {
    headway: f64,
    lane_change_headway: f64,
    tolerance: f64,
}

impl ConflictModel {
    /// Creates a model with one headway for every pair of vehicles.
    pub fn new(headway: f64) -> Result<Self> {
        if !headway.is_finite() || headway < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "headway must be finite and non-negative, got {headway}"
            )));
        }
        Ok(Self {
            headway,
            lane_change_headway: headway,
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    /// Sets a larger separation for consecutive vehicles from different lanes.
    pub fn with_lane_change_headway(mut self, headway: f64) -> Result<Self> {
        if !headway.is_finite() || headway < self.headway {
            return Err(Error::InvalidConfig(format!(
                "lane-change headway must be finite and at least {}, got {headway}",
                self.headway
            )));
        }
        self.lane_change_headway = headway;
        Ok(self)
    }

    /// Sets the slack used when checking a schedule.
    pub fn with_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Minimum separation between any two consecutive vehicles.
    pub fn headway(&self) -> f64 {
        self.headway
    }

    pub fn lane_change_headway(&self) -> f64 {
        self.lane_change_headway
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Required gap when a vehicle from `next_lane` follows one from `prev_lane`.
    #[inline]
    pub fn separation(&self, prev_lane: usize, next_lane: usize) -> f64 {
        if prev_lane == next_lane {
            self.headway
        } else {
            self.lane_change_headway
        }
    }

    /// Earliest feasible entry time for `vehicle` right after `previous`.
    #[inline]
    pub fn release(&self, previous: Option<(f64, usize)>, vehicle: &Vehicle) -> f64 {
        match previous {
            Some((time, lane)) => vehicle
                .arrival_time()
                .max(time + self.separation(lane, vehicle.lane())),
            None => vehicle.arrival_time(),
        }
    }

    /// Assigns entry times to a merge order, each vehicle as early as the
    /// constraint allows.
    pub fn resolve(
        &self,
        traffic: &Traffic,
        order: &[usize],
    ) -> std::result::Result<MergeSchedule, InvalidScheduleError> {
        let mut entries = Vec::with_capacity(order.len());
        let mut previous = None;
        for &id in order {
            let vehicle = traffic
                .vehicle(id)
                .ok_or(InvalidScheduleError::UnknownVehicle { vehicle: id })?;
            let scheduled_time = self.release(previous, vehicle);
            entries.push(ScheduledVehicle {
                vehicle: id,
                lane: vehicle.lane(),
                scheduled_time,
            });
            previous = Some((scheduled_time, vehicle.lane()));
        }
        Ok(MergeSchedule::new(entries))
    }

    /// Recomputes entry times of an ordered vehicle slice from `from` onward.
    pub(crate) fn retime(&self, vehicles: &[Vehicle], times: &mut [f64], from: usize) {
        for i in from..vehicles.len() {
            let previous = i
                .checked_sub(1)
                .map(|p| (times[p], vehicles[p].lane()));
            times[i] = self.release(previous, &vehicles[i]);
        }
    }

    /// Checks `schedule` against `traffic` and computes its delay metrics.
    ///
    /// Fails if the schedule is not a permutation of the traffic's vehicles,
    /// if any vehicle enters before it arrives, or if two consecutive
    /// vehicles are closer than the required separation.
    pub fn score(
        &self,
        traffic: &Traffic,
        schedule: &MergeSchedule,
    ) -> std::result::Result<DelayMetrics, InvalidScheduleError> {
        if schedule.len() != traffic.len() {
            return Err(InvalidScheduleError::NotAPermutation {
                expected: traffic.len(),
                scheduled: schedule.len(),
            });
        }

        let mut seen = vec![false; traffic.len()];
        let mut total_delay = 0.0;
        let mut max_delay = 0.0_f64;
        let mut previous: Option<&ScheduledVehicle> = None;

        for (position, entry) in schedule.iter().enumerate() {
            let vehicle = traffic
                .vehicle(entry.vehicle)
                .ok_or(InvalidScheduleError::UnknownVehicle {
                    vehicle: entry.vehicle,
                })?;
            if std::mem::replace(&mut seen[entry.vehicle], true) {
                return Err(InvalidScheduleError::DuplicateVehicle {
                    vehicle: entry.vehicle,
                });
            }
            if vehicle.lane() != entry.lane {
                return Err(InvalidScheduleError::LaneMismatch {
                    vehicle: entry.vehicle,
                    actual: vehicle.lane(),
                    scheduled: entry.lane,
                });
            }
            if !entry.scheduled_time.is_finite()
                || entry.scheduled_time + self.tolerance < vehicle.arrival_time()
            {
                return Err(InvalidScheduleError::BeforeArrival {
                    vehicle: entry.vehicle,
                    arrival_time: vehicle.arrival_time(),
                    scheduled_time: entry.scheduled_time,
                });
            }
            if let Some(prev) = previous {
                let required = self.separation(prev.lane, entry.lane);
                if entry.scheduled_time + self.tolerance < prev.scheduled_time + required {
                    return Err(InvalidScheduleError::HeadwayViolation {
                        position,
                        previous: prev.vehicle,
                        next: entry.vehicle,
                        gap: entry.scheduled_time - prev.scheduled_time,
                        required,
                    });
                }
            }

            let delay = (entry.scheduled_time - vehicle.arrival_time()).max(0.0);
            total_delay += delay;
            max_delay = max_delay.max(delay);
            previous = Some(entry);
        }

        let vehicles = schedule.len();
        Ok(DelayMetrics {
            mean_delay: if vehicles == 0 {
                0.0
            } else {
                total_delay / vehicles as f64
            },
            max_delay,
            t_last: schedule.t_last(),
            total_delay,
            vehicles,
        })
    }
}
