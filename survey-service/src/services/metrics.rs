//! Metrics collection and Prometheus export.
//!
//! Installs the Prometheus recorder and exposes the helpers handlers use to
//! record domain metrics.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() -> Result<(), AppError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::InternalError(anyhow::anyhow!(
            "failed to install Prometheus recorder: {}",
            e
        ))
    })?;

    // Lost race: the other caller's handle renders the same global recorder.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_db_query(operation: &'static str, elapsed: Duration) {
    histogram!("survey_db_query_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

/// `outcome` is one of `saved`, `invalid`, `duplicate`, `error`.
pub fn record_submission(outcome: &'static str) {
    counter!("survey_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_fire_alert() {
    counter!("fire_alerts_total").increment(1);
}

/// `status` is the upstream HTTP status, or `error` when no answer arrived.
pub fn record_generation(status: &str, elapsed: Duration) {
    let status = status.to_string();
    counter!("generation_requests_total", "status" => status).increment(1);
    histogram!("generation_request_duration_seconds").record(elapsed.as_secs_f64());
}
