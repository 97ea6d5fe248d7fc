//! Annealing configuration and cooling schedules.

/// Cooling schedule for temperature reduction, applied once per iteration.
///
/// # References
///
/// - Geometric: standard textbook approach
/// - Linear: fixed-duration cooling over the iteration budget
/// - LundyMees: Lundy & Mees (1986), with convergence proof
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// Geometric (exponential) cooling: `T_{k+1} = alpha * T_k`.
    Geometric {
        /// Cooling factor in (0, 1]. Higher = slower cooling.
        alpha: f64,
    },

    /// Geometric cooling spread over the run:
    /// `T_k = T_0 * (T_min / T_0)^(k / iterations)`.
    ///
    /// Reaches `T_min` exactly when the budget (or the current restart
    /// cycle) runs out, whatever the number of iterations.
    Exponential,

    /// Linear cooling: `T_k = T_0 - k * (T_0 - T_min) / iterations`.
    Linear,

    /// Lundy-Mees cooling: `T_{k+1} = T_k / (1 + beta * T_k)`.
    LundyMees {
        /// Cooling parameter. Typically `(T_0 - T_min) / (iterations * T_0 * T_min)`.
        beta: f64,
    },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Exponential
    }
}

/// Configuration for [`AnnealingPolicy`](super::AnnealingPolicy).
///
/// # Examples
///
/// ```
/// use u_lanemerge::policy::{AnnealingConfig, CoolingSchedule};
///
/// let config = AnnealingConfig::default()
///     .with_iterations(5_000)
///     .with_initial_temperature(20.0)
///     .with_cooling(CoolingSchedule::Geometric { alpha: 0.998 })
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnealingConfig {
    /// Number of proposals. 0 returns the FCFS schedule.
    pub iterations: usize,

    /// Initial temperature. Higher values accept more uphill moves early on.
    pub initial_temperature: f64,

    /// The temperature never drops below this floor.
    pub min_temperature: f64,

    /// Cooling schedule.
    pub cooling: CoolingSchedule,

    /// Longest same-lane segment moved by one proposal.
    ///
    /// A proposal picks two adjacent vehicles from different lanes and
    /// exchanges up to this many vehicles from each side of the boundary,
    /// which is a chain of adjacent cross-lane swaps applied at once. 1 means
    /// single adjacent swaps only.
    pub max_segment: usize,

    /// Number of times the search restarts from the best order at the
    /// initial temperature. The budget is split evenly between cycles.
    pub restarts: usize,

    /// Optional wall-clock budget in milliseconds.
    ///
    /// Runs stopped by the clock are not reproducible; leave unset when
    /// comparing seeded runs.
    pub time_limit_ms: Option<u64>,

    /// Random seed for reproducibility. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            iterations: 20_000,
            initial_temperature: 10.0,
            min_temperature: 1e-3,
            cooling: CoolingSchedule::default(),
            max_segment: 8,
            restarts: 3,
            time_limit_ms: None,
            seed: None,
        }
    }
}

impl AnnealingConfig {
    pub fn with_iterations(mut self, n: usize) -> Self {
        self.iterations = n;
        self
    }

    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    /// Shorthand for geometric cooling with the given rate.
    pub fn with_cooling_rate(self, alpha: f64) -> Self {
        self.with_cooling(CoolingSchedule::Geometric { alpha })
    }

    pub fn with_max_segment(mut self, n: usize) -> Self {
        self.max_segment = n;
        self
    }

    pub fn with_restarts(mut self, n: usize) -> Self {
        self.restarts = n;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.initial_temperature.is_finite() || self.initial_temperature < 0.0 {
            return Err("initial_temperature must be non-negative and finite".into());
        }
        if self.min_temperature.is_nan() || self.min_temperature < 0.0 {
            return Err("min_temperature must be non-negative".into());
        }
        if self.min_temperature > self.initial_temperature {
            return Err("min_temperature must not exceed initial_temperature".into());
        }
        if self.max_segment == 0 {
            return Err("max_segment must be at least 1".into());
        }
        match self.cooling {
            CoolingSchedule::Geometric { alpha } => {
                if alpha.is_nan() || alpha <= 0.0 || alpha > 1.0 {
                    return Err(format!("geometric alpha must be in (0, 1], got {alpha}"));
                }
            }
            CoolingSchedule::Exponential => {
                if self.min_temperature <= 0.0 {
                    return Err("exponential cooling needs a positive min_temperature".into());
                }
            }
            CoolingSchedule::LundyMees { beta } => {
                if !beta.is_finite() || beta <= 0.0 {
                    return Err(format!("lundy-mees beta must be positive, got {beta}"));
                }
            }
            CoolingSchedule::Linear => {}
        }
        Ok(())
    }
}
