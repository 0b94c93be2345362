//! Brush-to-zoom domain rescaling
//!
//! A brush selection over a chart's time axis either zooms the chart to the
//! selected pixel span, or (when empty) schedules a reset to the full data
//! extent after a debounce delay. The debounce is a deadline polled with
//! caller-supplied instants; any new selection cancels it.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;

/// Linear map from a data domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub fn set_domain(&mut self, domain: (f64, f64)) {
        self.domain = domain;
    }

    /// Data value to pixel.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) * (r1 - r0) / (d1 - d0)
    }

    /// Pixel to data value.
    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (pixel - r0) * (d1 - d0) / (r1 - r0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainChangeReason {
    Zoom,
    Reset,
}

/// New horizontal domain the renderer must redraw axis, grid and lines
/// against over `transition`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DomainChange {
    pub domain: (f64, f64),
    pub transition: Duration,
    pub reason: DomainChangeReason,
}

/// Cancellable one-shot deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetDebounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl ResetDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or re-arm) the deadline at `now + delay`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the deadline if it has been reached.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Horizontal brushing state of one chart (QoS line or loss magnitude).
#[derive(Debug, Clone, PartialEq)]
pub struct BrushedChart {
    x: LinearScale,
    full_extent: (f64, f64),
    y_domain: (f64, f64),
    selection: Option<(f64, f64)>,
    debounce: ResetDebounce,
    transition: Duration,
}

impl BrushedChart {
    pub fn new(
        full_extent: (f64, f64),
        width: f64,
        y_domain: (f64, f64),
        debounce: Duration,
        transition: Duration,
    ) -> Self {
        Self {
            x: LinearScale::new(full_extent, (0.0, width)),
            full_extent,
            y_domain,
            selection: None,
            debounce: ResetDebounce::new(debounce),
            transition,
        }
    }

    pub fn from_config(
        full_extent: (f64, f64),
        width: f64,
        y_domain: (f64, f64),
        config: &AnalysisConfig,
    ) -> Self {
        Self::new(
            full_extent,
            width,
            y_domain,
            config.brush_debounce(),
            config.transition(),
        )
    }

    pub fn scale(&self) -> &LinearScale {
        &self.x
    }

    pub fn domain(&self) -> (f64, f64) {
        self.x.domain()
    }

    pub fn full_extent(&self) -> (f64, f64) {
        self.full_extent
    }

    pub fn y_domain(&self) -> (f64, f64) {
        self.y_domain
    }

    pub fn selection(&self) -> Option<(f64, f64)> {
        self.selection
    }

    pub fn reset_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Track the in-progress brush while dragging.
    pub fn brush_move(&mut self, selection: Option<(f64, f64)>) {
        self.selection = selection;
    }

    /// Finish a brush gesture at `now`.
    pub fn brush_end(
        &mut self,
        selection: Option<(f64, f64)>,
        now: Instant,
    ) -> Option<DomainChange> {
        let Some((px0, px1)) = selection else {
            self.selection = None;
            self.debounce.arm(now);
            debug!(
                phase = "brush",
                delay_ms = self.debounce.delay().as_millis() as u64,
                "domain reset armed"
            );
            return None;
        };

        self.debounce.cancel();
        let (left, right) = if px0 <= px1 { (px0, px1) } else { (px1, px0) };
        let domain = (self.x.invert(left), self.x.invert(right));
        self.x.set_domain(domain);
        self.selection = None;

        debug!(
            phase = "brush",
            from = domain.0,
            to = domain.1,
            "zoomed to selection"
        );
        Some(DomainChange {
            domain,
            transition: self.transition,
            reason: DomainChangeReason::Zoom,
        })
    }

    /// Reset to the full extent once the debounce deadline has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<DomainChange> {
        if !self.debounce.fire(now) {
            return None;
        }

        self.x.set_domain(self.full_extent);
        debug!(
            phase = "brush",
            from = self.full_extent.0,
            to = self.full_extent.1,
            "domain reset"
        );
        Some(DomainChange {
            domain: self.full_extent,
            transition: self.transition,
            reason: DomainChangeReason::Reset,
        })
    }
}
