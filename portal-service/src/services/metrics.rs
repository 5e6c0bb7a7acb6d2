//! Prometheus metrics wiring.
//!
//! Counters are recorded with the `metrics` macros at the call sites
//! (sessions created, questions, quota denials, file failures); this
//! module owns the recorder and renders the /metrics scrape body.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide recorder. Call once at startup, before any
/// counter is touched; panics on a second call.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        panic!("metrics recorder already initialized");
    }
}

/// Render the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}
