//! Dashboard session state
//!
//! Owns the loaded series, the service graph, the two brushed charts and
//! the current specification overlay. Drawing is delegated to a
//! [`ChartRenderer`]; nothing here depends on a rendering library.

use std::time::Instant;

use tracing::{info, warn};

use crate::brush::{BrushedChart, DomainChange};
use crate::catalog::SpecificationSource;
use crate::config::AnalysisConfig;
use crate::detector::EventDetector;
use crate::envelope::{EnvelopePoint, SpecificationOverlay};
use crate::graph::{Service, ServiceGraph};
use crate::measurement::{Measurement, MeasurementSeries, Specification};

/// Vertical domain of the QoS chart.
pub const QOS_Y_DOMAIN: (f64, f64) = (0.0, 110.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// QoS line with the specification overlay.
    Qos,
    /// Failure-loss magnitude line.
    Loss,
}

/// Rendering capability the dashboard drives.
pub trait ChartRenderer {
    /// Draw the raw series and the specification envelope on one scale.
    fn render(&mut self, series: &[Measurement], envelope: &[EnvelopePoint]);
    /// Remove the specification envelope.
    fn clear(&mut self);
    /// Redraw axis, grid and lines of `chart` against a new time domain.
    fn on_domain_change(&mut self, chart: ChartKind, change: DomainChange);
}

pub struct Dashboard<R> {
    detector: EventDetector,
    series: MeasurementSeries,
    graph: ServiceGraph,
    qos_chart: BrushedChart,
    loss_chart: BrushedChart,
    selected_service: Option<String>,
    overlay: Option<SpecificationOverlay>,
    renderer: R,
}

impl<R: ChartRenderer> Dashboard<R> {
    pub fn new(
        series: MeasurementSeries,
        graph: ServiceGraph,
        config: &AnalysisConfig,
        width: f64,
        renderer: R,
    ) -> Self {
        let extent = series.time_extent().unwrap_or((0.0, 0.0));
        let [loss_low, loss_high] = config.loss_y_domain;

        Self {
            detector: EventDetector::from_config(config),
            qos_chart: BrushedChart::from_config(extent, width, QOS_Y_DOMAIN, config),
            loss_chart: BrushedChart::from_config(extent, width, (loss_low, loss_high), config),
            series,
            graph,
            selected_service: None,
            overlay: None,
            renderer,
        }
    }

    pub fn series(&self) -> &MeasurementSeries {
        &self.series
    }

    pub fn graph(&self) -> &ServiceGraph {
        &self.graph
    }

    pub fn overlay(&self) -> Option<&SpecificationOverlay> {
        self.overlay.as_ref()
    }

    pub fn specification(&self) -> Option<&Specification> {
        self.overlay.as_ref().map(|o| &o.specification)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn chart(&self, kind: ChartKind) -> &BrushedChart {
        match kind {
            ChartKind::Qos => &self.qos_chart,
            ChartKind::Loss => &self.loss_chart,
        }
    }

    fn chart_mut(&mut self, kind: ChartKind) -> &mut BrushedChart {
        match kind {
            ChartKind::Qos => &mut self.qos_chart,
            ChartKind::Loss => &mut self.loss_chart,
        }
    }

    pub fn selected_service(&self) -> Option<&Service> {
        self.selected_service
            .as_deref()
            .and_then(|id| self.graph.service(id))
    }

    /// Select (highlight) a service by its display name.
    ///
    /// Switching to another service drops the previous service's overlay.
    pub fn select_service(&mut self, name: &str) -> Option<&Service> {
        let id = self.graph.find_by_name(name)?.id.clone();
        if self.selected_service.as_deref() != Some(id.as_str()) {
            self.remove_overlay();
        }
        info!(phase = "select", service = %id, "service selected");
        self.selected_service = Some(id);
        self.selected_service()
    }

    /// Replace the overlay with one computed for `spec`.
    ///
    /// The previous overlay is always removed first. A missing or invalid
    /// specification leaves no overlay. Returns whether one was drawn.
    pub fn show_specification(&mut self, spec: Option<Specification>) -> bool {
        self.remove_overlay();

        let Some(spec) = spec else {
            warn!(phase = "overlay", "no specification available, overlay skipped");
            return false;
        };
        if let Err(error) = spec.validate() {
            warn!(phase = "overlay", %error, "specification rejected, overlay skipped");
            return false;
        }

        let overlay = SpecificationOverlay::compute(self.series.as_slice(), &self.detector, spec);
        self.renderer.render(self.series.as_slice(), &overlay.envelope);
        self.overlay = Some(overlay);
        true
    }

    /// Fetch the specification for the selected service and `cause`, then
    /// show it. Fetch failures degrade to no overlay.
    pub fn show_specification_from<S: SpecificationSource>(
        &mut self,
        source: &S,
        cause: &str,
    ) -> bool {
        let Some(service_id) = self.selected_service.clone() else {
            self.remove_overlay();
            warn!(phase = "overlay", "no service selected, overlay skipped");
            return false;
        };

        let spec = match source.fetch(&service_id, cause) {
            Ok(spec) => spec,
            Err(error) => {
                warn!(
                    phase = "overlay",
                    service = %service_id,
                    cause,
                    %error,
                    "specification fetch failed"
                );
                None
            }
        };
        self.show_specification(spec)
    }

    /// Clear the rendered envelope and drop the cached specification.
    pub fn hide_specification(&mut self) {
        self.remove_overlay();
    }

    fn remove_overlay(&mut self) {
        if self.overlay.take().is_some() {
            self.renderer.clear();
        }
    }

    /// Forward a finished brush gesture on `kind`.
    pub fn brush_end(&mut self, kind: ChartKind, selection: Option<(f64, f64)>, now: Instant) {
        if let Some(change) = self.chart_mut(kind).brush_end(selection, now) {
            self.renderer.on_domain_change(kind, change);
        }
    }

    /// Apply any elapsed domain resets.
    pub fn poll(&mut self, now: Instant) {
        for kind in [ChartKind::Qos, ChartKind::Loss] {
            if let Some(change) = self.chart_mut(kind).poll(now) {
                self.renderer.on_domain_change(kind, change);
            }
        }
    }
}
