//! QoS resilience analysis
//!
//! Detects resilience events in a quality-of-service time series and builds
//! the specification envelope a dashboard overlays on the raw QoS line.
//! Rendering is delegated to a [`ChartRenderer`] supplied by the caller.

pub mod brush;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod detector;
pub mod envelope;
pub mod graph;
pub mod measurement;
pub mod output;
pub mod sim;
pub mod stats;

use thiserror::Error;

// Re-export main types
pub use brush::{BrushedChart, DomainChange, LinearScale, ResetDebounce};
pub use catalog::{SpecificationCatalog, SpecificationSource};
pub use config::AnalysisConfig;
pub use dashboard::{ChartKind, ChartRenderer, Dashboard};
pub use detector::{EventDetector, ResilienceEvent, ScanState};
pub use envelope::{
    assess_events, build_envelope, EnvelopePoint, EventAssessment, SpecificationOverlay,
};
pub use graph::{Dependency, Service, ServiceGraph};
pub use measurement::{Measurement, MeasurementSeries, Specification};
pub use sim::{generate_series, Disruption, SimConfig};
pub use stats::MedianRule;

/// Full-health QoS level; the envelope starts, ends and recovers here.
pub const FULL_QOS: f64 = 100.0;

#[derive(Debug, Error)]
pub enum ResilienceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),
    #[error("series is not time ordered at index {index}")]
    UnorderedSeries { index: usize },
    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },
    #[error("dependency references unknown service '{0}'")]
    UnknownService(String),
}
