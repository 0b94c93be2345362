//! Specification envelope construction and compliance assessment.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::detector::{EventDetector, ResilienceEvent};
use crate::measurement::{Measurement, Specification};
use crate::FULL_QOS;

/// One vertex of the specification polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub time: f64,
    pub qos: f64,
}

impl EnvelopePoint {
    pub fn new(time: f64, qos: f64) -> Self {
        Self { time, qos }
    }

    fn full(time: f64) -> Self {
        Self::new(time, FULL_QOS)
    }
}

/// Build the step-shaped envelope for `events`.
///
/// Each event contributes a vertical drop at its loss time and a vertical
/// return to full QoS at its recovery deadline; those duplicate-time vertices
/// are what the renderer draws as sharp edges.
pub fn build_envelope(
    series: &[Measurement],
    events: &[ResilienceEvent],
    spec: &Specification,
) -> Vec<EnvelopePoint> {
    let first_time = series.first().map(|m| m.time).unwrap_or(0.0);
    let mut points = Vec::with_capacity(2 + events.len() * 3);
    points.push(EnvelopePoint::full(first_time));

    let Some(last) = series.last() else {
        return points;
    };

    for event in events {
        let loss_time = event.initial_loss_time;
        points.push(EnvelopePoint::full(loss_time));
        points.push(EnvelopePoint::new(loss_time, FULL_QOS - spec.max_initial_loss));
        points.push(EnvelopePoint::full(event.recovery_deadline));
    }

    // A deadline may run past the series end.
    let tail = points.last().map(|p| p.time).unwrap_or(first_time);
    points.push(EnvelopePoint::full(last.time.max(tail)));

    points
}

/// Whether one event stayed within the specification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventAssessment {
    pub initial_loss_time: f64,
    /// Observed trough is no deeper than the allowed loss.
    pub within_initial_loss: bool,
    /// Transient behavior ended no later than the recovery deadline.
    pub recovered_by_deadline: bool,
}

impl EventAssessment {
    pub fn is_compliant(&self) -> bool {
        self.within_initial_loss && self.recovered_by_deadline
    }
}

pub fn assess_events(events: &[ResilienceEvent], spec: &Specification) -> Vec<EventAssessment> {
    let floor = FULL_QOS - spec.max_initial_loss;
    events
        .iter()
        .map(|event| EventAssessment {
            initial_loss_time: event.initial_loss_time,
            within_initial_loss: event.initial_loss_qos >= floor,
            recovered_by_deadline: event.transient_end <= event.recovery_deadline,
        })
        .collect()
}

/// Everything drawn for one specification over one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecificationOverlay {
    pub specification: Specification,
    pub events: Vec<ResilienceEvent>,
    pub envelope: Vec<EnvelopePoint>,
    pub assessments: Vec<EventAssessment>,
}

impl SpecificationOverlay {
    pub fn compute(
        series: &[Measurement],
        detector: &EventDetector,
        specification: Specification,
    ) -> Self {
        let events = detector.detect(series, &specification);
        let envelope = build_envelope(series, &events, &specification);
        let assessments = assess_events(&events, &specification);

        info!(
            phase = "overlay",
            samples = series.len(),
            events = events.len(),
            envelope_points = envelope.len(),
            violations = assessments.iter().filter(|a| !a.is_compliant()).count(),
            "specification overlay computed"
        );

        Self {
            specification,
            events,
            envelope,
            assessments,
        }
    }

    pub fn is_compliant(&self) -> bool {
        self.assessments.iter().all(EventAssessment::is_compliant)
    }
}
