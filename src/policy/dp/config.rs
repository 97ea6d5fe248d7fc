//! DP configuration.

/// Configuration for [`DpPolicy`](super::DpPolicy).
///
/// # Examples
///
/// ```
/// use u_lanemerge::policy::DpConfig;
///
/// let config = DpConfig::default().with_max_states(50_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DpConfig {
    /// Largest cursor-state table the solver will build.
    ///
    /// The table has `prod(lane_len + 1)` entries; instances above the
    /// ceiling are declined with an `IntractableSizeError`.
    pub max_states: usize,
}

impl Default for DpConfig {
    fn default() -> Self {
        Self {
            max_states: 1_000_000,
        }
    }
}

impl DpConfig {
    pub fn with_max_states(mut self, n: usize) -> Self {
        self.max_states = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_states == 0 {
            return Err("max_states must be at least 1".into());
        }
        Ok(())
    }
}
