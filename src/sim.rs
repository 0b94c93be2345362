//! Synthetic QoS series
//!
//! Generates a seeded, deterministic QoS series with scripted disruptions
//! for demos and tests.

use std::fs;
use std::path::Path;

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::measurement::{Measurement, MeasurementSeries};
use crate::{ResilienceError, FULL_QOS};

/// One scripted disruption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Disruption {
    /// Step at which QoS drops.
    pub start: usize,
    /// QoS points lost at the trough.
    pub depth: f64,
    /// Steps spent at the trough.
    pub hold: usize,
    /// Steps of linear recovery back to baseline.
    pub recovery: usize,
}

impl Disruption {
    /// QoS deficit at `step`.
    fn deficit(&self, step: usize) -> f64 {
        if step < self.start {
            return 0.0;
        }
        let offset = step - self.start;
        if offset < self.hold {
            return self.depth;
        }
        let into_recovery = offset - self.hold;
        if into_recovery >= self.recovery {
            return 0.0;
        }
        self.depth * (1.0 - (into_recovery + 1) as f64 / (self.recovery + 1) as f64)
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub dt: f64,
    pub steps: usize,
    pub baseline_qos: f64,
    pub sigma_noise: f64,
    /// Scale from QoS deficit to failure-loss magnitude.
    pub loss_scale: f64,
    pub disruptions: Vec<Disruption>,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            steps: 200,
            baseline_qos: 99.0,
            sigma_noise: 0.5,
            loss_scale: 150.0,
            disruptions: vec![
                Disruption {
                    start: 40,
                    depth: 55.0,
                    hold: 4,
                    recovery: 8,
                },
                Disruption {
                    start: 120,
                    depth: 70.0,
                    hold: 6,
                    recovery: 20,
                },
            ],
            seed: 42,
        }
    }
}

impl SimConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ResilienceError> {
        let raw = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ResilienceError> {
        if self.steps == 0 {
            return Err(ResilienceError::InvalidConfig(
                "steps must be greater than zero".to_string(),
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ResilienceError::InvalidConfig("dt must be > 0".to_string()));
        }
        if !self.sigma_noise.is_finite() || self.sigma_noise < 0.0 {
            return Err(ResilienceError::InvalidConfig(
                "sigma_noise must be >= 0".to_string(),
            ));
        }
        if !(0.0..=FULL_QOS).contains(&self.baseline_qos) {
            return Err(ResilienceError::InvalidConfig(
                "baseline_qos must be within 0..=100".to_string(),
            ));
        }
        if self
            .disruptions
            .iter()
            .any(|d| !d.depth.is_finite() || d.depth < 0.0)
        {
            return Err(ResilienceError::InvalidConfig(
                "disruption depth must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate the series described by `config`.
pub fn generate_series(config: &SimConfig) -> Result<MeasurementSeries, ResilienceError> {
    config.validate()?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);
    let noise_dist = Normal::new(0.0, config.sigma_noise)
        .map_err(|e| ResilienceError::InvalidConfig(format!("sigma_noise: {e}")))?;

    let mut samples = Vec::with_capacity(config.steps);
    for step in 0..config.steps {
        let t = step as f64 * config.dt;

        // Overlapping disruptions take the deepest deficit.
        let deficit = config
            .disruptions
            .iter()
            .map(|d| d.deficit(step))
            .fold(0.0_f64, f64::max);

        let noise = noise_dist.sample(&mut rng);
        let qos = (config.baseline_qos - deficit + noise).clamp(0.0, FULL_QOS);
        let failure_loss = deficit * config.loss_scale;

        samples.push(Measurement::new(t, qos).with_failure_loss(failure_loss));
    }

    MeasurementSeries::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::EventDetector;
    use crate::measurement::Specification;

    #[test]
    fn test_simulation_runs() {
        let config = SimConfig {
            steps: 100,
            ..Default::default()
        };
        let series = generate_series(&config).unwrap();
        assert_eq!(series.len(), 100);
        assert_eq!(series.last_time(), Some(99.0));
    }

    #[test]
    fn same_seed_same_series() {
        let config = SimConfig::default();
        assert_eq!(
            generate_series(&config).unwrap(),
            generate_series(&config).unwrap()
        );
    }

    #[test]
    fn deficit_profile() {
        let d = Disruption {
            start: 10,
            depth: 60.0,
            hold: 2,
            recovery: 3,
        };
        assert_eq!(d.deficit(9), 0.0);
        assert_eq!(d.deficit(10), 60.0);
        assert_eq!(d.deficit(11), 60.0);
        assert_eq!(d.deficit(12), 45.0);
        assert_eq!(d.deficit(14), 15.0);
        assert_eq!(d.deficit(15), 0.0);
    }

    #[test]
    fn default_disruptions_are_detected() {
        let series = generate_series(&SimConfig::default()).unwrap();
        let spec = Specification::new(60.0, 15.0).unwrap();
        let events = EventDetector::new(90.0, 50.0).detect(series.as_slice(), &spec);

        assert_eq!(events.len(), 2);
        assert!((40.0..=44.0).contains(&events[0].initial_loss_time));
        assert!((120.0..=126.0).contains(&events[1].initial_loss_time));
    }

    #[test]
    fn loads_and_validates_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        fs::write(&path, "steps = 30\nseed = 7\ndisruptions = []\n").unwrap();
        let config = SimConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.steps, 30);
        assert_eq!(config.seed, 7);
        assert!(config.disruptions.is_empty());
        assert_eq!(config.dt, 1.0);

        fs::write(&path, "steps = 0\n").unwrap();
        assert!(matches!(
            SimConfig::from_toml_file(&path),
            Err(ResilienceError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_steps() {
        let config = SimConfig {
            steps: 0,
            ..Default::default()
        };
        assert!(generate_series(&config).is_err());
    }
}
