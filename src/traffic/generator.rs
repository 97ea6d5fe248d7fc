//! Poisson arrival generation.

use super::config::TrafficConfig;
use super::types::Traffic;
use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Exp};

/// Generates multi-lane traffic with independent Poisson arrivals per lane.
///
/// For each lane, inter-arrival gaps are drawn from an exponential
/// distribution with mean `1 / rate` and accumulated until the running time
/// exceeds the horizon; the overshooting arrival is discarded.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    config: TrafficConfig,
    gaps: Option<Exp<f64>>,
}

impl TrafficGenerator {
    pub fn new(config: TrafficConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        let gaps = if config.rate > 0.0 {
            Some(Exp::new(config.rate).map_err(|e| Error::InvalidConfig(e.to_string()))?)
        } else {
            None
        };
        Ok(Self { config, gaps })
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }

    /// Generates one traffic instance.
    ///
    /// A zero rate, zero horizon, or zero lanes yields an empty instance.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Traffic> {
        let lanes: Vec<Vec<f64>> = (0..self.config.lane_count)
            .map(|_| self.sample_lane(rng))
            .collect();
        let traffic = Traffic::from_lanes(&lanes)?;

        tracing::debug!(
            lanes = self.config.lane_count,
            rate = self.config.rate,
            horizon = self.config.horizon,
            vehicles = traffic.len(),
            "generated traffic"
        );
        Ok(traffic)
    }

    /// Generates one instance from bare parameters.
    pub fn generate_with<R: Rng + ?Sized>(
        lane_count: usize,
        rate: f64,
        horizon: f64,
        rng: &mut R,
    ) -> Result<Traffic> {
        let config = TrafficConfig::default()
            .with_lane_count(lane_count)
            .with_rate(rate)
            .with_horizon(horizon);
        Self::new(config)?.generate(rng)
    }

    fn sample_lane<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let Some(gaps) = self.gaps.as_ref() else {
            return Vec::new();
        };
        if self.config.horizon <= 0.0 {
            return Vec::new();
        }

        let cap = self.config.max_per_lane.unwrap_or(usize::MAX);
        let mut arrivals = Vec::new();
        let mut t = 0.0;
        while arrivals.len() < cap {
            t += gaps.sample(rng);
            if t > self.config.horizon {
                break;
            }
            // A zero-length gap would give two vehicles the same arrival on one lane.
            if arrivals.last().is_some_and(|&last| t <= last) {
                continue;
            }
            arrivals.push(t);
        }
        arrivals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_zero_rate_is_empty() {
        let mut rng = create_rng(1);
        let traffic = TrafficGenerator::generate_with(2, 0.0, 100.0, &mut rng).unwrap();
        assert!(traffic.is_empty());
        assert_eq!(traffic.lane_count(), 2);
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let mut rng = create_rng(1);
        let traffic = TrafficGenerator::generate_with(2, 0.5, 0.0, &mut rng).unwrap();
        assert!(traffic.is_empty());
    }

    #[test]
    fn test_zero_lanes_is_empty() {
        let mut rng = create_rng(1);
        let traffic = TrafficGenerator::generate_with(0, 0.5, 10.0, &mut rng).unwrap();
        assert!(traffic.is_empty());
        assert_eq!(traffic.lane_count(), 0);
    }

    #[test]
    fn test_arrivals_within_horizon_and_increasing() {
        let mut rng = create_rng(42);
        let traffic = TrafficGenerator::generate_with(3, 0.5, 40.0, &mut rng).unwrap();
        assert!(!traffic.is_empty());
        for lane in traffic.lane_arrival_times() {
            for w in lane.windows(2) {
                assert!(w[0] < w[1]);
            }
            for &t in &lane {
                assert!((0.0..=40.0).contains(&t));
            }
        }
    }

    #[test]
    fn test_max_per_lane_cap() {
        let config = TrafficConfig::default()
            .with_rate(5.0)
            .with_horizon(100.0)
            .with_max_per_lane(7);
        let generator = TrafficGenerator::new(config).unwrap();
        let traffic = generator.generate(&mut create_rng(3)).unwrap();
        assert_eq!(traffic.lane_sizes(), vec![7, 7]);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let generator = TrafficGenerator::new(TrafficConfig::default()).unwrap();
        let a = generator.generate(&mut create_rng(11)).unwrap();
        let b = generator.generate(&mut create_rng(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mean_count_tracks_rate() {
        // 200 trials of 2 lanes x rate 0.5 x horizon 20 => 20 expected per trial.
        let config = TrafficConfig::default().with_rate(0.5).with_horizon(20.0);
        let generator = TrafficGenerator::new(config.clone()).unwrap();
        let mut rng = create_rng(2024);
        let total: usize = (0..200)
            .map(|_| generator.generate(&mut rng).unwrap().len())
            .sum();
        let mean = total as f64 / 200.0;
        assert!(
            (mean - config.expected_vehicles()).abs() < 2.0,
            "mean arrivals {mean} far from {}",
            config.expected_vehicles()
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrafficConfig::default().with_rate(f64::NAN);
        assert!(matches!(
            TrafficGenerator::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
