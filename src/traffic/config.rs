//! Traffic generation parameters.

/// Configuration for [`TrafficGenerator`](super::TrafficGenerator).
///
/// # Examples
///
/// ```
/// use u_lanemerge::traffic::TrafficConfig;
///
/// let config = TrafficConfig::default()
///     .with_lane_count(3)
///     .with_rate(0.2)
///     .with_horizon(50.0)
///     .with_max_per_lane(20);
/// assert!(config.validate().is_ok());
/// assert!((config.expected_vehicles() - 30.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficConfig {
    /// Number of incoming lanes.
    pub lane_count: usize,

    /// Poisson arrival intensity per lane (vehicles per second).
    pub rate: f64,

    /// Arrivals are generated on `[0, horizon]`.
    pub horizon: f64,

    /// Optional cap on vehicles per lane.
    pub max_per_lane: Option<usize>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            lane_count: 2,
            rate: 0.3,
            horizon: 100.0,
            max_per_lane: None,
        }
    }
}

impl TrafficConfig {
    pub fn with_lane_count(mut self, n: usize) -> Self {
        self.lane_count = n;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_max_per_lane(mut self, n: usize) -> Self {
        self.max_per_lane = Some(n);
        self
    }

    /// Expected total number of arrivals, ignoring the per-lane cap.
    pub fn expected_vehicles(&self) -> f64 {
        self.lane_count as f64 * self.rate * self.horizon
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.rate.is_finite() || self.rate < 0.0 {
            return Err(format!("rate must be finite and non-negative, got {}", self.rate));
        }
        if !self.horizon.is_finite() || self.horizon < 0.0 {
            return Err(format!(
                "horizon must be finite and non-negative, got {}",
                self.horizon
            ));
        }
        Ok(())
    }
}
