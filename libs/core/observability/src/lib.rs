//! Observability utilities for the cost-and-usage aggregation pipeline.
//!
//! This crate provides Prometheus metrics recording for pipeline runs. The
//! pipeline itself serves no HTTP API; callers that do expose one (e.g. a
//! sidecar health/metrics server) can render the registered metrics with
//! `get_metrics_handle()`.
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, PipelineMetrics};
//!
//! init_metrics();
//! PipelineMetrics::record_rows_read("OCP", "openshift_pod_usage_line_items_daily", 120_000);
//! ```

pub mod pipeline;

pub use pipeline::PipelineMetrics;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at process startup.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        info!("Prometheus metrics recorder initialized");
        pipeline::register_metric_descriptions();

        handle
    })
}

/// Get the metrics handle (must call `init_metrics` first).
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render the current metrics snapshot, e.g. for a `/metrics` scrape.
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}
