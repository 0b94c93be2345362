use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::stats::{MedianRule, DEFAULT_LOOKAHEAD};
use crate::ResilienceError;

/// Detection thresholds and chart interaction timings.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Nominal full-health QoS; samples below it are loss candidates.
    #[serde_as(as = "DefaultOnNull")]
    pub expected_qos: f64,
    /// Noise floor a lookahead median must stay under to confirm a loss.
    #[serde_as(as = "DefaultOnNull")]
    pub qos_threshold: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub lookahead: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub median_rule: MedianRule,
    #[serde_as(as = "DefaultOnNull")]
    pub brush_debounce_ms: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub transition_ms: u64,
    /// Vertical domain of the loss-magnitude chart.
    #[serde_as(as = "DefaultOnNull")]
    pub loss_y_domain: [f64; 2],
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            expected_qos: 90.0,
            qos_threshold: 50.0,
            lookahead: DEFAULT_LOOKAHEAD,
            median_rule: MedianRule::default(),
            brush_debounce_ms: 350,
            transition_ms: 1000,
            loss_y_domain: [0.0, 20_000.0],
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ResilienceError> {
        let raw = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ResilienceError> {
        let raw = fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load by extension: `.json` is JSON, anything else is TOML.
    pub fn from_file(path: &Path) -> Result<Self, ResilienceError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    pub fn validate(&self) -> Result<(), ResilienceError> {
        for (name, value) in [
            ("expected_qos", self.expected_qos),
            ("qos_threshold", self.qos_threshold),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ResilienceError::InvalidConfig(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }

        if self.lookahead == 0 {
            return Err(ResilienceError::InvalidConfig(
                "lookahead must be greater than zero".to_string(),
            ));
        }

        if self.brush_debounce_ms == 0 || self.transition_ms == 0 {
            return Err(ResilienceError::InvalidConfig(
                "brush_debounce_ms and transition_ms must be greater than zero".to_string(),
            ));
        }

        let [low, high] = self.loss_y_domain;
        if !low.is_finite() || !high.is_finite() || high <= low {
            return Err(ResilienceError::InvalidConfig(
                "loss_y_domain must be an increasing pair of finite values".to_string(),
            ));
        }

        Ok(())
    }

    pub fn brush_debounce(&self) -> Duration {
        Duration::from_millis(self.brush_debounce_ms)
    }

    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}
