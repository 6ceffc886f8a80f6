// Copyright (c) 2025 The glbc authors
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the glbc controller.
//!
//! All metrics live under the `glbc_dev_` namespace and are exposed on the
//! metrics HTTP server's `/metrics` endpoint.
//!
//! # Example
//!
//! ```rust,no_run
//! use glbc::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("Ingress", std::time::Duration::from_millis(120));
//! ```

use crate::constants::METRICS_SERVER_PATH;
use anyhow::Result;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

/// Namespace prefix for all glbc metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "glbc_dev";

/// Global Prometheus metrics registry, exposed via the `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by traffic kind and status
///
/// Labels:
/// - `kind`: Traffic kind (`Ingress`, `Route`)
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by traffic kind and status",
    );
    let counter = CounterVec::new(opts, &["kind", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `kind`: Traffic kind (`Ingress`, `Route`)
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by traffic kind",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Certificate Metrics
// ============================================================================

/// Total number of TLS certificates requested from the issuance backend
pub static TLS_CERTIFICATE_REQUESTS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_tls_certificate_requests_total"),
        "Total number of TLS certificates requested from the issuance backend",
    );
    let counter = Counter::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of TLS certificates observed transitioning to ready
pub static TLS_CERTIFICATE_ISSUED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_tls_certificate_issued_total"),
        "Total number of TLS certificates observed transitioning to ready",
    );
    let counter = Counter::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Admission Metrics
// ============================================================================

/// Seconds between a traffic resource's creation and its first DNSRecord
pub static OBJECT_TIME_TO_ADMISSION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_object_time_to_admission_seconds"),
        "Seconds between a traffic resource's creation and its first DNSRecord",
    )
    .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Recording Helpers
// ============================================================================

/// Record a successful reconciliation and its duration.
pub fn record_reconciliation_success(kind: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[kind, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation.
pub fn record_reconciliation_error(kind: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[kind, "error"])
        .inc();
}

/// Record a certificate request sent to the issuance backend.
pub fn record_certificate_requested() {
    TLS_CERTIFICATE_REQUESTS_TOTAL.inc();
}

/// Record a certificate observed transitioning to ready.
pub fn record_certificate_issued() {
    TLS_CERTIFICATE_ISSUED_TOTAL.inc();
}

/// Record the time between a resource's creation and its first DNSRecord.
pub fn observe_time_to_admission(seconds: f64) {
    if seconds >= 0.0 {
        OBJECT_TIME_TO_ADMISSION_SECONDS.observe(seconds);
    }
}

/// Render the registry in the Prometheus text exposition format.
#[must_use]
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder
        .encode(&METRICS_REGISTRY.gather(), &mut buffer)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Serve the metrics endpoint on `addr` until the process exits.
pub async fn serve(addr: &str) -> Result<()> {
    let router = Router::new().route(METRICS_SERVER_PATH, get(|| async { gather() }));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, path = METRICS_SERVER_PATH, "metrics server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod metrics_tests;
