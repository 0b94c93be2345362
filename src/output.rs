use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::envelope::{EnvelopePoint, SpecificationOverlay};
use crate::measurement::Measurement;
use crate::ResilienceError;

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Summary written next to the CSV files of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport<'a> {
    pub schema_version: &'static str,
    pub generated_at: String,
    pub samples: usize,
    pub config: &'a AnalysisConfig,
    pub compliant: bool,
    pub overlay: &'a SpecificationOverlay,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(
        samples: usize,
        config: &'a AnalysisConfig,
        overlay: &'a SpecificationOverlay,
    ) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            samples,
            config,
            compliant: overlay.is_compliant(),
            overlay,
        }
    }
}

/// Create `<root>/<UTC timestamp>` with a numeric suffix on collision.
pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, ResilienceError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

pub fn write_series_csv(path: &Path, series: &[Measurement]) -> Result<(), ResilienceError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["time", "qos", "failure_loss"])?;

    for sample in series {
        writer.write_record([
            fmt_f64(sample.time),
            fmt_f64(sample.qos),
            fmt_f64(sample.failure_loss),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_envelope_csv(
    path: &Path,
    envelope: &[EnvelopePoint],
) -> Result<(), ResilienceError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["time", "qos"])?;

    for point in envelope {
        writer.write_record([fmt_f64(point.time), fmt_f64(point.qos)])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_events_csv(
    path: &Path,
    overlay: &SpecificationOverlay,
) -> Result<(), ResilienceError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record([
        "trigger_index",
        "loss_index",
        "initial_loss_time",
        "initial_loss_qos",
        "recovery_deadline",
        "transient_end",
        "within_initial_loss",
        "recovered_by_deadline",
    ])?;

    for (event, assessment) in overlay.events.iter().zip(&overlay.assessments) {
        writer.write_record([
            event.trigger_index.to_string(),
            event.loss_index.to_string(),
            fmt_f64(event.initial_loss_time),
            fmt_f64(event.initial_loss_qos),
            fmt_f64(event.recovery_deadline),
            fmt_f64(event.transient_end),
            assessment.within_initial_loss.to_string(),
            assessment.recovered_by_deadline.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &AnalysisReport<'_>) -> Result<(), ResilienceError> {
    let payload = serde_json::to_string_pretty(report)?;
    fs::write(path, payload)?;
    Ok(())
}

/// Write `events.csv`, `envelope.csv` and `report.json` into `output_dir`.
pub fn write_analysis(
    output_dir: &Path,
    samples: usize,
    config: &AnalysisConfig,
    overlay: &SpecificationOverlay,
) -> Result<(), ResilienceError> {
    fs::create_dir_all(output_dir)?;
    write_events_csv(&output_dir.join("events.csv"), overlay)?;
    write_envelope_csv(&output_dir.join("envelope.csv"), &overlay.envelope)?;
    write_report_json(
        &output_dir.join("report.json"),
        &AnalysisReport::new(samples, config, overlay),
    )?;
    Ok(())
}
