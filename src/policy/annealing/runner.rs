//! Annealing execution loop.

use super::config::{AnnealingConfig, CoolingSchedule};
use crate::conflict::ConflictModel;
use crate::error::{Error, Result};
use crate::policy::{MergePolicy, SIMULATED_ANNEALING};
use crate::random::{create_rng, resolve_seed};
use crate::schedule::MergeSchedule;
use crate::traffic::{Traffic, Vehicle};
use rand::Rng;
use std::time::{Duration, Instant};

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct AnnealingResult {
    /// The best schedule found.
    pub schedule: MergeSchedule,

    /// Total delay of `schedule`, recomputed by the conflict model.
    pub best_cost: f64,

    /// Total delay of the FCFS starting point.
    pub initial_cost: f64,

    /// Number of proposals made.
    pub iterations: usize,

    /// Temperature when the loop stopped.
    pub final_temperature: f64,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: usize,

    /// Number of improving moves.
    pub improving_moves: usize,

    /// Proposals rejected without evaluation because both vehicles share a lane.
    pub infeasible_moves: usize,

    /// Restart cycles begun from the best order.
    pub restarts: usize,

    /// Whether the wall-clock budget stopped the run.
    pub timed_out: bool,

    /// Best cost sampled at regular intervals. Non-increasing.
    pub cost_history: Vec<f64>,
}

/// Simulated annealing over lane interleavings.
///
/// Starts from the FCFS schedule and proposes swaps of two adjacent
/// vehicles. Swaps within one lane would break arrival order and are
/// rejected without being scored. A cross-lane swap may be widened into an
/// exchange of the same-lane segments meeting at that boundary (see
/// [`AnnealingConfig::max_segment`]); the candidate is rescored from the
/// first moved vehicle onward and accepted by the Metropolis criterion. The
/// temperature is cooled once per proposal, the budget is split into
/// restart cycles that resume from the best order, and the best schedule
/// seen is returned.
///
/// With a fixed seed the run is a pure function of the traffic, the model
/// and the configuration.
#[derive(Debug, Clone, Default)]
pub struct AnnealingPolicy {
    config: AnnealingConfig,
}

impl AnnealingPolicy {
    pub fn new(config: AnnealingConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    /// Runs a plain adjacent-swap search with explicit parameters.
    ///
    /// The temperature is multiplied by `cooling_rate` after every proposal
    /// with no floor and no restarts. Any `initial_temperature >= 0` and
    /// `cooling_rate` in `(0, 1]` is accepted.
    pub fn schedule_with(
        traffic: &Traffic,
        model: &ConflictModel,
        iterations: usize,
        initial_temperature: f64,
        cooling_rate: f64,
        seed: u64,
    ) -> Result<MergeSchedule> {
        let config = AnnealingConfig::default()
            .with_iterations(iterations)
            .with_initial_temperature(initial_temperature)
            .with_min_temperature(0.0)
            .with_cooling_rate(cooling_rate)
            .with_max_segment(1)
            .with_restarts(0)
            .with_seed(seed);
        Ok(Self::new(config)?.run(traffic, model)?.schedule)
    }

    /// Runs the search with an RNG seeded from the configuration.
    pub fn run(&self, traffic: &Traffic, model: &ConflictModel) -> Result<AnnealingResult> {
        let mut rng = create_rng(resolve_seed(self.config.seed));
        self.run_with_rng(traffic, model, &mut rng)
    }

    /// Runs the search drawing from `rng`.
    pub fn run_with_rng<R: Rng>(
        &self,
        traffic: &Traffic,
        model: &ConflictModel,
        rng: &mut R,
    ) -> Result<AnnealingResult> {
        let config = &self.config;

        // Traffic holds vehicles in (arrival_time, id) order: the FCFS schedule.
        let mut search = Search::new(
            model,
            traffic.vehicles().to_vec(),
            config.initial_temperature,
        );
        let initial_cost = search.best_cost;

        // Without two non-empty lanes every adjacent swap stays within one lane.
        let movable = traffic.lane_sizes().iter().filter(|&&n| n > 0).count() >= 2;

        let deadline = config
            .time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let history_interval = 100.max(config.iterations / 100);
        let cycle = config.iterations.div_ceil(config.restarts + 1).max(1);
        let mut cost_history = vec![search.best_cost];
        let mut restarts = 0;
        let mut timed_out = false;

        if movable {
            for step in 0..config.iterations {
                if let Some(deadline) = deadline {
                    if step % 64 == 0 && Instant::now() >= deadline {
                        timed_out = true;
                        break;
                    }
                }

                let cycle_step = step % cycle;
                if step > 0 && cycle_step == 0 {
                    search.restart(model, config.initial_temperature);
                    restarts += 1;
                }

                search.step(model, config.max_segment, rng);
                search.temperature = cool(search.temperature, config, cycle_step, cycle);

                if search.iterations % history_interval == 0 {
                    cost_history.push(search.best_cost);
                }
            }
        }

        let order: Vec<usize> = search.best.iter().map(Vehicle::id).collect();
        let schedule = model.resolve(traffic, &order)?;
        let best_cost = model.score(traffic, &schedule)?.total_delay;
        debug_assert!(best_cost.is_finite(), "non-finite annealing cost");

        if cost_history
            .last()
            .is_none_or(|&last| (last - best_cost).abs() > 1e-15)
        {
            cost_history.push(best_cost);
        }

        tracing::debug!(
            vehicles = traffic.len(),
            iterations = search.iterations,
            accepted = search.accepted_moves,
            improving = search.improving_moves,
            infeasible = search.infeasible_moves,
            restarts,
            initial_cost,
            best_cost,
            timed_out,
            "annealing finished"
        );

        Ok(AnnealingResult {
            schedule,
            best_cost,
            initial_cost,
            iterations: search.iterations,
            final_temperature: search.temperature,
            accepted_moves: search.accepted_moves,
            improving_moves: search.improving_moves,
            infeasible_moves: search.infeasible_moves,
            restarts,
            timed_out,
            cost_history,
        })
    }
}

impl MergePolicy for AnnealingPolicy {
    fn name(&self) -> &str {
        SIMULATED_ANNEALING
    }

    fn schedule(&self, traffic: &Traffic, model: &ConflictModel) -> Result<MergeSchedule> {
        Ok(self.run(traffic, model)?.schedule)
    }
}

/// A merge order with its entry times and running delay sums.
struct Timeline {
    order: Vec<Vehicle>,
    times: Vec<f64>,
    cumulative: Vec<f64>,
}

impl Timeline {
    fn new(model: &ConflictModel, order: Vec<Vehicle>) -> Self {
        let n = order.len();
        let mut timeline = Self {
            order,
            times: vec![0.0; n],
            cumulative: vec![0.0; n],
        };
        timeline.rescore(model, 0);
        timeline
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    /// Total delay.
    fn cost(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn rescore(&mut self, model: &ConflictModel, from: usize) {
        model.retime(&self.order, &mut self.times, from);
        for i in from..self.order.len() {
            let before = if i == 0 { 0.0 } else { self.cumulative[i - 1] };
            self.cumulative[i] = before + (self.times[i] - self.order[i].arrival_time());
        }
    }

    fn is_cross_lane(&self, i: usize) -> bool {
        self.order[i].lane() != self.order[i + 1].lane()
    }

    /// Lengths of the same-lane runs ending at `i` and starting at `i + 1`,
    /// each capped at `cap`.
    fn runs_at(&self, i: usize, cap: usize) -> (usize, usize) {
        let left_lane = self.order[i].lane();
        let right_lane = self.order[i + 1].lane();
        let left = self.order[..=i]
            .iter()
            .rev()
            .take(cap)
            .take_while(|v| v.lane() == left_lane)
            .count();
        let right = self.order[i + 1..]
            .iter()
            .take(cap)
            .take_while(|v| v.lane() == right_lane)
            .count();
        (left, right)
    }

    /// Moves the `right` vehicles after the boundary at `i` in front of the
    /// `left` vehicles ending at `i`. Both segments keep their inner order.
    fn exchange(&mut self, model: &ConflictModel, i: usize, left: usize, right: usize) {
        let start = i + 1 - left;
        self.order[start..=i + right].rotate_left(left);
        self.rescore(model, start);
    }

    /// Reverts [`exchange`](Self::exchange) with the same arguments.
    fn undo_exchange(&mut self, model: &ConflictModel, i: usize, left: usize, right: usize) {
        let start = i + 1 - left;
        self.order[start..=i + right].rotate_right(left);
        self.rescore(model, start);
    }
}

/// Search accumulator threaded through the annealing loop.
struct Search {
    current: Timeline,
    best: Vec<Vehicle>,
    best_cost: f64,
    temperature: f64,
    iterations: usize,
    accepted_moves: usize,
    improving_moves: usize,
    infeasible_moves: usize,
}

impl Search {
    fn new(model: &ConflictModel, order: Vec<Vehicle>, temperature: f64) -> Self {
        let current = Timeline::new(model, order);
        Self {
            best: current.order.clone(),
            best_cost: current.cost(),
            current,
            temperature,
            iterations: 0,
            accepted_moves: 0,
            improving_moves: 0,
            infeasible_moves: 0,
        }
    }

    /// Continues from the best order seen, reheated to `temperature`.
    fn restart(&mut self, model: &ConflictModel, temperature: f64) {
        if self.current.cost() > self.best_cost {
            self.current = Timeline::new(model, self.best.clone());
        }
        self.temperature = temperature;
    }

    /// One proposal. Requires at least two vehicles.
    fn step<R: Rng>(&mut self, model: &ConflictModel, max_segment: usize, rng: &mut R) {
        self.iterations += 1;

        let i = rng.random_range(0..self.current.len() - 1);
        if !self.current.is_cross_lane(i) {
            self.infeasible_moves += 1;
            return;
        }

        let (left_run, right_run) = self.current.runs_at(i, max_segment);
        let left = if left_run > 1 { rng.random_range(1..=left_run) } else { 1 };
        let right = if right_run > 1 { rng.random_range(1..=right_run) } else { 1 };

        let current_cost = self.current.cost();
        self.current.exchange(model, i, left, right);
        let candidate_cost = self.current.cost();
        debug_assert!(candidate_cost.is_finite(), "non-finite candidate cost");
        let delta = candidate_cost - current_cost;

        // Metropolis acceptance criterion
        let accept = if delta < 0.0 {
            self.improving_moves += 1;
            true
        } else if self.temperature > 0.0 {
            let probability = (-delta / self.temperature).exp();
            rng.random_range(0.0..1.0) < probability
        } else {
            false
        };

        if accept {
            self.accepted_moves += 1;
            if candidate_cost < self.best_cost {
                self.best.clone_from(&self.current.order);
                self.best_cost = candidate_cost;
            }
        } else {
            self.current.undo_exchange(model, i, left, right);
        }
    }
}

/// Apply the cooling schedule to compute the next temperature.
///
/// `step` counts proposals within the current restart cycle of `cycle`
/// proposals.
fn cool(temperature: f64, config: &AnnealingConfig, step: usize, cycle: usize) -> f64 {
    let progress = (step + 1) as f64 / cycle.max(1) as f64;
    let next = match config.cooling {
        CoolingSchedule::Geometric { alpha } => temperature * alpha,

        CoolingSchedule::Exponential => {
            let ratio = config.min_temperature / config.initial_temperature;
            config.initial_temperature * ratio.powf(progress)
        }

        CoolingSchedule::Linear => {
            let span = config.initial_temperature - config.min_temperature;
            config.initial_temperature - progress * span
        }

        CoolingSchedule::LundyMees { beta } => temperature / (1.0 + beta * temperature),
    };
    next.max(config.min_temperature)
}
