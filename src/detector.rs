//! Resilience event detection
//!
//! Scans a QoS series for confirmed initial losses, locates the trough of
//! each loss and the point where transient behavior ends.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::measurement::{Measurement, Specification};
use crate::stats::{median_qos_ahead, min_qos_index_ahead, MedianRule, DEFAULT_LOOKAHEAD};

/// One detected resilience event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResilienceEvent {
    /// First sub-threshold sample that confirmed the loss.
    pub trigger_index: usize,
    /// Index of the trough within the lookahead window.
    pub loss_index: usize,
    pub initial_loss_time: f64,
    pub initial_loss_qos: f64,
    /// `initial_loss_time + max_recovery_time`.
    pub recovery_deadline: f64,
    /// Time at which QoS is stably back above the expected level, or the
    /// last sample time when it never is.
    pub transient_end: f64,
}

impl ResilienceEvent {
    /// Time after which a new event may open.
    pub fn closes_at(&self) -> f64 {
        self.recovery_deadline.max(self.transient_end)
    }
}

/// Scan state. A new event may only open while `Scanning`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanState {
    Scanning,
    EventOpen { deadline: f64, transient_end: f64 },
}

impl ScanState {
    /// Advance to `time`, closing an open event once `time` is past both of
    /// its gates. Returns whether the sample at `time` is eligible.
    pub fn advance(&mut self, time: f64) -> bool {
        match *self {
            ScanState::Scanning => true,
            ScanState::EventOpen {
                deadline,
                transient_end,
            } => {
                if time > deadline && time > transient_end {
                    *self = ScanState::Scanning;
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// Event detector over a pre-loaded series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventDetector {
    expected_qos: f64,
    qos_threshold: f64,
    lookahead: usize,
    median_rule: MedianRule,
}

impl EventDetector {
    pub fn new(expected_qos: f64, qos_threshold: f64) -> Self {
        Self {
            expected_qos,
            qos_threshold,
            lookahead: DEFAULT_LOOKAHEAD,
            median_rule: MedianRule::default(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            expected_qos: config.expected_qos,
            qos_threshold: config.qos_threshold,
            lookahead: config.lookahead.max(1),
            median_rule: config.median_rule,
        }
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead.max(1);
        self
    }

    pub fn with_median_rule(mut self, rule: MedianRule) -> Self {
        self.median_rule = rule;
        self
    }

    pub fn expected_qos(&self) -> f64 {
        self.expected_qos
    }

    pub fn qos_threshold(&self) -> f64 {
        self.qos_threshold
    }

    /// Detect all resilience events in `series`.
    pub fn detect(&self, series: &[Measurement], spec: &Specification) -> Vec<ResilienceEvent> {
        // A lone sample has no lookahead to confirm a loss against.
        if series.len() < 2 {
            return Vec::new();
        }

        let mut events = Vec::new();
        let mut state = ScanState::Scanning;

        for (index, sample) in series.iter().enumerate() {
            if !state.advance(sample.time) {
                continue;
            }

            if sample.qos >= self.expected_qos || !self.is_initial_loss(series, index) {
                continue;
            }

            let loss_index = min_qos_index_ahead(series, index, self.lookahead);
            let initial_loss = series[loss_index];
            let transient_end = self.transient_behavior_endpoint(series, loss_index);
            let recovery_deadline = initial_loss.time + spec.max_recovery_time;

            debug!(
                phase = "detect",
                trigger_index = index,
                loss_index,
                loss_time = initial_loss.time,
                loss_qos = initial_loss.qos,
                transient_end,
                recovery_deadline,
                "transient behavior from {} to {}",
                initial_loss.time,
                transient_end
            );

            events.push(ResilienceEvent {
                trigger_index: index,
                loss_index,
                initial_loss_time: initial_loss.time,
                initial_loss_qos: initial_loss.qos,
                recovery_deadline,
                transient_end,
            });

            state = ScanState::EventOpen {
                deadline: recovery_deadline,
                transient_end,
            };
        }

        events
    }

    /// A sub-expected sample is a genuine loss when the median of its
    /// lookahead window is still under the noise floor.
    pub fn is_initial_loss(&self, series: &[Measurement], index: usize) -> bool {
        median_qos_ahead(series, index, self.lookahead, self.median_rule) < self.qos_threshold
    }

    /// First time after `loss_index` at which QoS is back at the expected
    /// level with a stable lookahead median; the last sample time otherwise.
    pub fn transient_behavior_endpoint(&self, series: &[Measurement], loss_index: usize) -> f64 {
        let start = loss_index.saturating_add(1);
        for (index, sample) in series.iter().enumerate().skip(start) {
            if sample.qos >= self.expected_qos
                && median_qos_ahead(series, index, self.lookahead, self.median_rule)
                    >= self.qos_threshold
            {
                return sample.time;
            }
        }

        series.last().map(|m| m.time).unwrap_or(0.0)
    }
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(pairs: &[(f64, f64)]) -> Vec<Measurement> {
        pairs.iter().map(|&(t, q)| Measurement::new(t, q)).collect()
    }

    fn reference_series() -> Vec<Measurement> {
        series(&[
            (0.0, 100.0),
            (1.0, 100.0),
            (2.0, 40.0),
            (3.0, 42.0),
            (4.0, 45.0),
            (5.0, 60.0),
            (6.0, 100.0),
            (7.0, 100.0),
        ])
    }

    #[test]
    fn detects_reference_loss() {
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(60.0, 4.0).unwrap();
        let events = detector.detect(&reference_series(), &spec);

        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.loss_index, 2);
        assert_eq!(event.initial_loss_time, 2.0);
        assert_eq!(event.initial_loss_qos, 40.0);
        assert_eq!(event.recovery_deadline, 6.0);
        assert_eq!(event.transient_end, 6.0);
    }

    #[test]
    fn empty_series_has_no_events() {
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(10.0, 1.0).unwrap();
        assert!(detector.detect(&[], &spec).is_empty());
    }

    #[test]
    fn single_sample_has_no_events() {
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(60.0, 4.0).unwrap();
        assert!(detector.detect(&series(&[(0.0, 10.0)]), &spec).is_empty());
    }

    #[test]
    fn single_dip_is_noise() {
        let data = series(&[
            (0.0, 100.0),
            (1.0, 20.0),
            (2.0, 100.0),
            (3.0, 100.0),
            (4.0, 100.0),
            (5.0, 100.0),
        ]);
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(10.0, 1.0).unwrap();
        assert!(detector.detect(&data, &spec).is_empty());
    }

    #[test]
    fn threshold_equal_values_do_not_violate() {
        let data = series(&[(0.0, 90.0), (1.0, 90.0), (2.0, 90.0)]);
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(10.0, 1.0).unwrap();
        assert!(detector.detect(&data, &spec).is_empty());

        let data = series(&[(0.0, 50.0), (1.0, 50.0), (2.0, 50.0)]);
        assert!(detector.detect(&data, &spec).is_empty());
    }

    #[test]
    fn loss_index_is_window_minimum() {
        let data = series(&[
            (0.0, 45.0),
            (1.0, 30.0),
            (2.0, 10.0),
            (3.0, 10.0),
            (4.0, 35.0),
            (5.0, 100.0),
        ]);
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(95.0, 2.0).unwrap();
        let events = detector.detect(&data, &spec);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger_index, 0);
        assert_eq!(events[0].loss_index, 2);
        assert_eq!(events[0].initial_loss_time, 2.0);
    }

    #[test]
    fn unrecovered_loss_ends_at_last_sample() {
        let data = series(&[(0.0, 100.0), (1.0, 10.0), (2.0, 12.0), (3.0, 11.0)]);
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(50.0, 1.0).unwrap();
        let events = detector.detect(&data, &spec);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].transient_end, 3.0);
    }

    #[test]
    fn unstable_return_does_not_end_transient() {
        // t=5 is back above expected but its window median is 10.
        let data = series(&[
            (0.0, 100.0),
            (1.0, 100.0),
            (2.0, 5.0),
            (3.0, 20.0),
            (4.0, 20.0),
            (5.0, 95.0),
            (6.0, 10.0),
            (7.0, 10.0),
            (8.0, 10.0),
            (9.0, 100.0),
            (10.0, 100.0),
            (11.0, 100.0),
        ]);
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(95.0, 20.0).unwrap();
        assert!(detector.is_initial_loss(&data, 5));

        let events = detector.detect(&data, &spec);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].loss_index, 2);
        assert_eq!(events[0].transient_end, 9.0);
    }

    #[test]
    fn second_loss_waits_for_both_windows() {
        // Transient behavior ends at t=6 but the recovery deadline runs to
        // t=12, so the dip starting at t=11 only opens an event at t=13.
        let data = series(&[
            (0.0, 100.0),
            (1.0, 20.0),
            (2.0, 20.0),
            (3.0, 20.0),
            (4.0, 30.0),
            (5.0, 60.0),
            (6.0, 100.0),
            (7.0, 100.0),
            (8.0, 100.0),
            (9.0, 100.0),
            (10.0, 100.0),
            (11.0, 20.0),
            (12.0, 20.0),
            (13.0, 20.0),
            (14.0, 20.0),
            (15.0, 100.0),
        ]);
        let detector = EventDetector::new(90.0, 50.0);
        let spec = Specification::new(50.0, 11.0).unwrap();
        let events = detector.detect(&data, &spec);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].initial_loss_time, 1.0);
        assert_eq!(events[0].transient_end, 6.0);
        assert_eq!(events[0].recovery_deadline, 12.0);
        assert_eq!(events[1].trigger_index, 13);
        assert!(events[1].initial_loss_time > events[0].closes_at());
    }

    #[test]
    fn scan_state_reopens_only_past_both_gates() {
        let mut state = ScanState::EventOpen {
            deadline: 5.0,
            transient_end: 7.0,
        };
        assert!(!state.advance(5.0));
        assert!(!state.advance(6.0));
        assert!(!state.advance(7.0));
        assert!(state.advance(7.5));
        assert_eq!(state, ScanState::Scanning);
    }

    #[test]
    fn median_rule_changes_confirmation() {
        // Two-sample window [30, 40]: the literal rule gives 30 + 40 / 2 = 50
        // (noise), the mean gives 35 (loss).
        let data = series(&[
            (0.0, 100.0),
            (1.0, 30.0),
            (2.0, 40.0),
            (3.0, 100.0),
            (4.0, 100.0),
        ]);
        let spec = Specification::new(80.0, 1.0).unwrap();

        let literal = EventDetector::new(90.0, 50.0).with_lookahead(2);
        assert!(literal.detect(&data, &spec).is_empty());

        let corrected = literal.with_median_rule(MedianRule::Mean);
        let events = corrected.detect(&data, &spec);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].loss_index, 1);
        assert_eq!(events[0].transient_end, 3.0);
    }
}
