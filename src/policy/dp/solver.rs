//! Cursor-table solver.

use super::config::DpConfig;
use crate::conflict::ConflictModel;
use crate::error::{Error, IntractableSizeError, Result};
use crate::policy::{MergePolicy, DP};
use crate::schedule::{MergeSchedule, ScheduledVehicle};
use crate::traffic::{Traffic, Vehicle};

/// Result of an exact DP run.
#[derive(Debug, Clone)]
pub struct DpSolution {
    /// The minimum-total-delay schedule.
    pub schedule: MergeSchedule,

    /// Total delay of `schedule`.
    pub total_delay: f64,

    /// Number of cursor states in the table.
    pub states: usize,

    /// Labels kept across all states.
    pub labels: usize,

    /// Largest frontier held by a single state.
    pub max_frontier: usize,
}

/// A partial schedule reaching one cursor state.
#[derive(Debug, Clone, Copy)]
struct Label {
    /// Entry time and lane of the last merged vehicle; `None` at the root.
    last: Option<(f64, usize)>,
    /// Accumulated delay of the merged prefix.
    delay: f64,
    /// Vehicle merged by the transition into this state.
    vehicle: usize,
    /// `(state, label index)` this label was extended from.
    parent: Option<(usize, usize)>,
}

impl Label {
    const ROOT: Label = Label {
        last: None,
        delay: 0.0,
        vehicle: usize::MAX,
        parent: None,
    };

    /// Earliest time a vehicle from `lane` could follow this prefix.
    #[inline]
    fn ready(&self, model: &ConflictModel, lane: usize) -> f64 {
        match self.last {
            Some((time, last_lane)) => time + model.separation(last_lane, lane),
            None => f64::NEG_INFINITY,
        }
    }

    #[inline]
    fn lane(&self) -> usize {
        self.last.map_or(usize::MAX, |(_, lane)| lane)
    }

    /// `self` is at least as good as `other` for every possible continuation.
    fn dominates(&self, other: &Label, model: &ConflictModel, lane_count: usize) -> bool {
        self.delay <= other.delay
            && (0..lane_count).all(|k| self.ready(model, k) <= other.ready(model, k))
    }
}

/// Exact minimum-total-delay merge policy.
///
/// Within each lane the arrival order is kept; the solver chooses how the
/// lanes interleave. On exact ties the transition from the lowest lane
/// index wins.
#[derive(Debug, Clone, Default)]
pub struct DpPolicy {
    config: DpConfig,
}

impl DpPolicy {
    pub fn new(config: DpConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DpConfig {
        &self.config
    }

    /// Size of the cursor table for `traffic`, or `None` if it overflows.
    pub fn state_count(traffic: &Traffic) -> Option<usize> {
        traffic
            .lane_sizes()
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n + 1))
    }

    /// Whether `traffic` fits under the configured ceiling.
    pub fn is_tractable(&self, traffic: &Traffic) -> bool {
        Self::state_count(traffic).is_some_and(|n| n <= self.config.max_states)
    }

    /// Runs the exact search.
    pub fn solve(
        &self,
        traffic: &Traffic,
        model: &ConflictModel,
    ) -> std::result::Result<DpSolution, IntractableSizeError> {
        let states = Self::state_count(traffic).unwrap_or(usize::MAX);
        if states > self.config.max_states {
            return Err(IntractableSizeError {
                states,
                ceiling: self.config.max_states,
            });
        }

        let lanes: Vec<Vec<Vehicle>> = (0..traffic.lane_count())
            .map(|l| traffic.lane(l).copied().collect())
            .collect();
        let mut strides = Vec::with_capacity(lanes.len());
        let mut stride = 1usize;
        for lane in &lanes {
            strides.push(stride);
            stride *= lane.len() + 1;
        }

        let mut table: Vec<Vec<Label>> = vec![Vec::new(); states];
        table[0].push(Label::ROOT);
        let mut cursors = vec![0usize; lanes.len()];

        for state in 0..states {
            if state > 0 {
                advance(&mut cursors, &lanes);
            }
            let (head, tail) = table.split_at_mut(state + 1);
            let frontier = &head[state];

            for (lane, vehicles) in lanes.iter().enumerate() {
                let Some(vehicle) = vehicles.get(cursors[lane]) else {
                    continue;
                };
                // tail[0] is state + 1
                let target = &mut tail[strides[lane] - 1];
                for (k, label) in frontier.iter().enumerate() {
                    let time = model.release(label.last, vehicle);
                    let candidate = Label {
                        last: Some((time, lane)),
                        delay: label.delay + (time - vehicle.arrival_time()),
                        vehicle: vehicle.id(),
                        parent: Some((state, k)),
                    };
                    insert(target, candidate, model, lanes.len());
                }
            }
        }

        let labels: usize = table.iter().map(Vec::len).sum();
        let max_frontier = table.iter().map(Vec::len).max().unwrap_or(0);

        let terminal = states - 1;
        let best = table[terminal]
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.delay.total_cmp(&b.delay).then(a.lane().cmp(&b.lane())))
            .map(|(k, label)| (k, label.delay));

        let (schedule, total_delay) = match best {
            Some((k, total_delay)) => (reconstruct(&table, terminal, k), total_delay),
            None => (MergeSchedule::empty(), 0.0),
        };

        tracing::debug!(
            vehicles = traffic.len(),
            states,
            labels,
            max_frontier,
            total_delay,
            "dp solved"
        );

        Ok(DpSolution {
            schedule,
            total_delay,
            states,
            labels,
            max_frontier,
        })
    }
}

impl MergePolicy for DpPolicy {
    fn name(&self) -> &str {
        DP
    }

    fn schedule(&self, traffic: &Traffic, model: &ConflictModel) -> Result<MergeSchedule> {
        Ok(self.solve(traffic, model)?.schedule)
    }
}

/// Moves the cursor tuple to the next state index (lane 0 varies fastest).
fn advance(cursors: &mut [usize], lanes: &[Vec<Vehicle>]) {
    for (cursor, lane) in cursors.iter_mut().zip(lanes) {
        *cursor += 1;
        if *cursor <= lane.len() {
            return;
        }
        *cursor = 0;
    }
}

/// Adds `candidate` to a state's frontier unless an existing label dominates it.
fn insert(frontier: &mut Vec<Label>, candidate: Label, model: &ConflictModel, lane_count: usize) {
    for existing in frontier.iter() {
        if existing.dominates(&candidate, model, lane_count) {
            let wins_tie = candidate.lane() < existing.lane()
                && candidate.dominates(existing, model, lane_count);
            if !wins_tie {
                return;
            }
        }
    }
    frontier.retain(|e| !candidate.dominates(e, model, lane_count));
    frontier.push(candidate);
}

/// Follows parent links from a terminal label back to the root.
fn reconstruct(table: &[Vec<Label>], state: usize, index: usize) -> MergeSchedule {
    let mut entries = Vec::new();
    let mut cursor = Some((state, index));
    while let Some((s, k)) = cursor {
        let label = &table[s][k];
        if let Some((scheduled_time, lane)) = label.last {
            entries.push(ScheduledVehicle {
                vehicle: label.vehicle,
                lane,
                scheduled_time,
            });
        }
        cursor = label.parent;
    }
    entries.reverse();
    MergeSchedule::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::testing::{brute_force_total_delay, keeps_lane_order, lane_change_instance};
    use crate::policy::FcfsPolicy;
    use crate::random::create_rng;
    use crate::traffic::TrafficGenerator;
    use proptest::prelude::*;

    fn total_delay(traffic: &Traffic, model: &ConflictModel, schedule: &MergeSchedule) -> f64 {
        model.score(traffic, schedule).unwrap().total_delay
    }

    #[test]
    fn test_example_not_worse_than_fcfs() {
        let traffic = Traffic::from_lanes(&[vec![0.0, 2.0, 4.0], vec![0.5, 2.5]]).unwrap();
        let model = ConflictModel::new(1.0).unwrap();
        let dp = DpPolicy::default().solve(&traffic, &model).unwrap();
        let fcfs = FcfsPolicy.schedule(&traffic, &model).unwrap();

        assert_eq!(dp.states, 12);
        assert!(dp.total_delay <= total_delay(&traffic, &model, &fcfs) + 1e-9);
        assert!((dp.total_delay - total_delay(&traffic, &model, &dp.schedule)).abs() < 1e-9);
        assert!(keeps_lane_order(&traffic, &dp.schedule));
    }

    #[test]
    fn test_groups_lanes_under_lane_change_headway() {
        let (traffic, model) = lane_change_instance();
        let dp = DpPolicy::default().solve(&traffic, &model).unwrap();

        // Lane 0 first (0.0, 1.0), then lane 1 at 4.0: delays 0 + 0.5 + 3.8.
        assert_eq!(dp.schedule.order(), vec![0, 1, 2]);
        assert!((dp.total_delay - 4.3).abs() < 1e-9);
        let fcfs = FcfsPolicy.schedule(&traffic, &model).unwrap();
        assert!(dp.total_delay < total_delay(&traffic, &model, &fcfs));
    }

    #[test]
    fn test_single_lane_matches_fcfs() {
        let traffic = Traffic::from_lanes(&[vec![0.0, 0.3, 0.4, 5.0, 5.5]]).unwrap();
        let model = ConflictModel::new(1.0).unwrap();
        let dp = DpPolicy::default().solve(&traffic, &model).unwrap();
        let fcfs = FcfsPolicy.schedule(&traffic, &model).unwrap();
        assert_eq!(dp.schedule, fcfs);
    }

    #[test]
    fn test_uniform_headway_equals_fcfs_total() {
        // With one headway for every pair, merging in arrival order is optimal.
        let model = ConflictModel::new(1.0).unwrap();
        let mut rng = create_rng(5);
        for _ in 0..20 {
            let traffic = TrafficGenerator::generate_with(3, 0.4, 15.0, &mut rng).unwrap();
            let dp = DpPolicy::default().solve(&traffic, &model).unwrap();
            let fcfs = FcfsPolicy.schedule(&traffic, &model).unwrap();
            let fcfs_delay = total_delay(&traffic, &model, &fcfs);
            assert!(
                (dp.total_delay - fcfs_delay).abs() < 1e-6,
                "dp {} vs fcfs {fcfs_delay}",
                dp.total_delay
            );
        }
    }

    #[test]
    fn test_tie_goes_to_lowest_lane_last() {
        let traffic = Traffic::from_lanes(&[vec![0.0], vec![0.0]]).unwrap();
        let model = ConflictModel::new(1.0).unwrap();
        let dp = DpPolicy::default().solve(&traffic, &model).unwrap();
        assert_eq!(dp.schedule.order(), vec![1, 0]);
        assert!((dp.total_delay - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_traffic() {
        let model = ConflictModel::new(1.0).unwrap();
        for traffic in [Traffic::empty(0), Traffic::empty(3)] {
            let dp = DpPolicy::default().solve(&traffic, &model).unwrap();
            assert!(dp.schedule.is_empty());
            assert_eq!(dp.total_delay, 0.0);
            assert_eq!(dp.states, 1);
        }
    }

    #[test]
    fn test_ceiling() {
        let traffic = Traffic::from_lanes(&[vec![0.0, 2.0, 4.0], vec![0.5, 2.5]]).unwrap();
        let model = ConflictModel::new(1.0).unwrap();
        let policy = DpPolicy::new(DpConfig::default().with_max_states(10)).unwrap();
        assert!(!policy.is_tractable(&traffic));

        let err = policy.solve(&traffic, &model).unwrap_err();
        assert_eq!(
            err,
            IntractableSizeError {
                states: 12,
                ceiling: 10
            }
        );
        assert!(matches!(
            policy.schedule(&traffic, &model),
            Err(Error::IntractableSize(_))
        ));
    }

    #[test]
    fn test_matches_brute_force_three_lanes() {
        let traffic =
            Traffic::from_lanes(&[vec![0.0, 0.4, 3.0], vec![0.1, 0.2], vec![0.3, 1.0]]).unwrap();
        let model = ConflictModel::new(1.0)
            .unwrap()
            .with_lane_change_headway(2.5)
            .unwrap();
        let dp = DpPolicy::default().solve(&traffic, &model).unwrap();
        let brute = brute_force_total_delay(&traffic, &model);
        assert!((dp.total_delay - brute).abs() < 1e-9);
        assert!(keeps_lane_order(&traffic, &dp.schedule));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(DpPolicy::new(DpConfig::default().with_max_states(0)).is_err());
    }

    fn small_lanes() -> impl Strategy<Value = Vec<Vec<f64>>> {
        prop::collection::vec(
            prop::collection::vec(1u32..20, 0..3).prop_map(|gaps| {
                let mut t = 0.0;
                gaps.into_iter()
                    .map(|g| {
                        t += g as f64 * 0.25;
                        t
                    })
                    .collect()
            }),
            1..4,
        )
    }

    proptest! {
        #[test]
        fn prop_dp_is_optimal(lanes in small_lanes(), change in 0u32..4) {
            let traffic = Traffic::from_lanes(&lanes).unwrap();
            let model = ConflictModel::new(1.0)
                .unwrap()
                .with_lane_change_headway(1.0 + change as f64 * 0.5)
                .unwrap();
            let dp = DpPolicy::default().solve(&traffic, &model).unwrap();

            let metrics = model.score(&traffic, &dp.schedule).unwrap();
            prop_assert!(keeps_lane_order(&traffic, &dp.schedule));
            prop_assert!((metrics.total_delay - dp.total_delay).abs() < 1e-9);

            let brute = brute_force_total_delay(&traffic, &model);
            prop_assert!((dp.total_delay - brute).abs() < 1e-9,
                "dp {} vs brute force {}", dp.total_delay, brute);
        }
    }
}
