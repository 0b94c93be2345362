//! Measurement series and resilience specifications.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ResilienceError;

/// One QoS sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub time: f64,
    pub qos: f64,
    /// Auxiliary loss magnitude, plotted on its own axis.
    #[serde(rename = "failureLoss", alias = "failure_loss", default)]
    pub failure_loss: f64,
}

impl Measurement {
    pub fn new(time: f64, qos: f64) -> Self {
        Self {
            time,
            qos,
            failure_loss: 0.0,
        }
    }

    pub fn with_failure_loss(mut self, failure_loss: f64) -> Self {
        self.failure_loss = failure_loss;
        self
    }
}

/// A time-ordered, immutable sequence of measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementSeries {
    samples: Vec<Measurement>,
}

impl MeasurementSeries {
    /// Validate ordering and finiteness.
    pub fn new(samples: Vec<Measurement>) -> Result<Self, ResilienceError> {
        for (index, sample) in samples.iter().enumerate() {
            if !sample.time.is_finite() || !sample.qos.is_finite() {
                return Err(ResilienceError::NonFiniteSample { index });
            }
            if index > 0 && sample.time < samples[index - 1].time {
                return Err(ResilienceError::UnorderedSeries { index });
            }
        }
        Ok(Self { samples })
    }

    /// Build a series from `(time, qos)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ResilienceError> {
        Self::new(
            pairs
                .iter()
                .map(|&(time, qos)| Measurement::new(time, qos))
                .collect(),
        )
    }

    /// Load a series from a CSV file with `time,qos[,failure_loss]` headers.
    pub fn from_csv_file(path: &Path) -> Result<Self, ResilienceError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut samples = Vec::new();
        for record in reader.deserialize() {
            let sample: Measurement = record?;
            samples.push(sample);
        }
        Self::new(samples)
    }

    /// Load a series from a JSON array of measurements.
    pub fn from_json_file(path: &Path) -> Result<Self, ResilienceError> {
        let raw = fs::read_to_string(path)?;
        let samples: Vec<Measurement> = serde_json::from_str(&raw)?;
        Self::new(samples)
    }

    /// Load by extension: `.json` is JSON, anything else is CSV.
    pub fn from_file(path: &Path) -> Result<Self, ResilienceError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_csv_file(path),
        }
    }

    pub fn as_slice(&self) -> &[Measurement] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_time(&self) -> Option<f64> {
        self.samples.first().map(|m| m.time)
    }

    pub fn last_time(&self) -> Option<f64> {
        self.samples.last().map(|m| m.time)
    }

    /// `(first, last)` sample time.
    pub fn time_extent(&self) -> Option<(f64, f64)> {
        Some((self.first_time()?, self.last_time()?))
    }
}

impl AsRef<[Measurement]> for MeasurementSeries {
    fn as_ref(&self) -> &[Measurement] {
        &self.samples
    }
}

/// Declared resilience specification for one service and cause.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    /// Percentage points QoS may drop before the specification is violated.
    pub max_initial_loss: f64,
    /// Time allowed to return to full QoS after a loss.
    pub max_recovery_time: f64,
}

impl Specification {
    pub fn new(max_initial_loss: f64, max_recovery_time: f64) -> Result<Self, ResilienceError> {
        let spec = Self {
            max_initial_loss,
            max_recovery_time,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ResilienceError> {
        if !self.max_initial_loss.is_finite() || self.max_initial_loss < 0.0 {
            return Err(ResilienceError::InvalidSpecification(format!(
                "max_initial_loss must be finite and >= 0, got {}",
                self.max_initial_loss
            )));
        }
        if !self.max_recovery_time.is_finite() || self.max_recovery_time < 0.0 {
            return Err(ResilienceError::InvalidSpecification(format!(
                "max_recovery_time must be finite and >= 0, got {}",
                self.max_recovery_time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_unordered_series() {
        let err = MeasurementSeries::from_pairs(&[(0.0, 100.0), (2.0, 90.0), (1.0, 80.0)])
            .unwrap_err();
        assert!(matches!(err, ResilienceError::UnorderedSeries { index: 2 }));
    }

    #[test]
    fn rejects_non_finite_qos() {
        let err = MeasurementSeries::from_pairs(&[(0.0, f64::NAN)]).unwrap_err();
        assert!(matches!(err, ResilienceError::NonFiniteSample { index: 0 }));
    }

    #[test]
    fn equal_times_are_allowed() {
        let series = MeasurementSeries::from_pairs(&[(1.0, 100.0), (1.0, 50.0)]).unwrap();
        assert_eq!(series.time_extent(), Some((1.0, 1.0)));
    }

    #[test]
    fn empty_series_has_no_extent() {
        let series = MeasurementSeries::default();
        assert!(series.is_empty());
        assert_eq!(series.time_extent(), None);
    }

    #[test]
    fn loads_json_with_camel_case_failure_loss() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"time":0,"qos":100,"failureLoss":0}},{{"time":1,"qos":70,"failureLoss":1200.5}}]"#
        )
        .unwrap();
        let series = MeasurementSeries::from_file(file.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.as_slice()[1].failure_loss, 1200.5);
    }

    #[test]
    fn loads_csv_without_failure_loss_column() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "time,qos").unwrap();
        writeln!(file, "0.0,100.0").unwrap();
        writeln!(file, "1.0,42.0").unwrap();
        file.flush().unwrap();
        let series = MeasurementSeries::from_file(file.path()).unwrap();
        assert_eq!(series.as_slice()[1], Measurement::new(1.0, 42.0));
    }

    #[test]
    fn specification_rejects_negative_values() {
        assert!(Specification::new(-1.0, 4.0).is_err());
        assert!(Specification::new(10.0, -0.5).is_err());
        assert!(Specification::new(0.0, 0.0).is_ok());
    }
}
