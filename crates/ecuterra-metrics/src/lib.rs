//! Metric declarations for the terrain pipeline.
//!
//! Every metric the pipeline records is declared once as a [`Metric`]
//! constant in [`metric_defs`], so names and label keys cannot drift
//! between the recording site and dashboards. The `metrics` crate is
//! re-exported; without an installed recorder all recording is a no-op.
//!
//! # Example
//!
//! ```rust
//! use ecuterra_metrics::{describe_metrics, metric_defs, StageTimer};
//!
//! describe_metrics();
//!
//! metrics::counter!(metric_defs::REQUESTS.name, "mode" => "preview").increment(1);
//! {
//!     let _timer = StageTimer::start("clip");
//!     // ... work ...
//! }
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use std::time::Instant;

/// The kind of metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonically increasing count.
    Counter,
    /// Value that can go up and down.
    Gauge,
    /// Distribution of recorded values.
    Histogram,
}

impl MetricKind {
    /// Lowercase name of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use ecuterra_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const TILES_LOADED: Metric = Metric::counter("ecuterra.dem.tiles_loaded")
///     .with_description("HGT tiles merged into the mosaic")
///     .with_unit(Unit::Count);
///
/// assert_eq!(TILES_LOADED.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Metric name, dot separated (e.g. `ecuterra.mesh.faces`).
    pub name: &'static str,
    /// Counter, gauge or histogram.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Label keys recorded with this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Counter named `name`.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Gauge named `name`.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Histogram named `name`.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Set the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Register the description and unit with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(self.name, unit, self.description),
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metrics recorded by the pipeline.
pub mod metric_defs {
    use super::{Metric, Unit};

    // Requests

    pub const REQUESTS: Metric = Metric::counter("ecuterra.requests")
        .with_description("Terrain requests received")
        .with_unit(Unit::Count)
        .with_labels(&["mode"]);

    pub const SELECTIONS_REJECTED: Metric = Metric::counter("ecuterra.selections_rejected")
        .with_description("Selections refused before any elevation read")
        .with_unit(Unit::Count)
        .with_labels(&["reason"]);

    pub const REQUESTS_FAILED: Metric = Metric::counter("ecuterra.requests_failed")
        .with_description("Requests aborted after validation")
        .with_unit(Unit::Count)
        .with_labels(&["mode", "stage"]);

    // Data sources

    pub const SOURCE_SAMPLES: Metric = Metric::gauge("ecuterra.dem.source_samples")
        .with_description("Samples in the loaded elevation source")
        .with_unit(Unit::Count);

    // Pipeline stages

    pub const GRID_CELLS: Metric = Metric::histogram("ecuterra.dem.grid_cells")
        .with_description("Samples in the clipped elevation grid")
        .with_unit(Unit::Count);

    pub const MESH_FACES: Metric = Metric::histogram("ecuterra.mesh.faces")
        .with_description("Triangles in the final mesh")
        .with_unit(Unit::Count);

    pub const EXPORT_BYTES: Metric = Metric::histogram("ecuterra.export.bytes")
        .with_description("Size of exported artifacts")
        .with_unit(Unit::Bytes)
        .with_labels(&["format"]);

    pub const STAGE_DURATION: Metric = Metric::histogram("ecuterra.stage.duration_seconds")
        .with_description("Wall-clock time spent in each pipeline stage")
        .with_unit(Unit::Seconds)
        .with_labels(&["stage"]);

    pub const ALL: &[&Metric] = &[
        &REQUESTS,
        &SELECTIONS_REJECTED,
        &REQUESTS_FAILED,
        &SOURCE_SAMPLES,
        &GRID_CELLS,
        &MESH_FACES,
        &EXPORT_BYTES,
        &STAGE_DURATION,
    ];
}

/// Records [`metric_defs::STAGE_DURATION`] for a stage when dropped.
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    started: Instant,
}

impl StageTimer {
    /// Start timing `stage`.
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    /// Stage being timed.
    pub fn stage(&self) -> &'static str {
        self.stage
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        metrics::histogram!(metric_defs::STAGE_DURATION.name, "stage" => self.stage)
            .record(self.started.elapsed().as_secs_f64());
    }
}

/// Register descriptions for every metric in [`metric_defs::ALL`].
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_definitions() {
        assert_eq!(metric_defs::REQUESTS.kind, MetricKind::Counter);
        assert_eq!(metric_defs::REQUESTS.labels, &["mode"]);
        assert_eq!(metric_defs::STAGE_DURATION.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::STAGE_DURATION.unit, Some(Unit::Seconds));
    }

    #[test]
    fn test_names_unique_and_prefixed() {
        let mut names = HashSet::new();
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("ecuterra."), "{}", metric.name);
            assert!(!metric.description.is_empty(), "{} lacks a description", metric.name);
            assert!(names.insert(metric.name), "duplicate metric {}", metric.name);
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(MetricKind::Gauge.to_string(), "gauge");
    }

    #[test]
    fn test_recording_without_recorder() {
        describe_metrics();
        let timer = StageTimer::start("mesh");
        assert_eq!(timer.stage(), "mesh");
        drop(timer);
    }
}
