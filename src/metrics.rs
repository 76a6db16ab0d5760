// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the cmxsafe controller.
//!
//! All metrics carry the namespace prefix `cmxsafe_io_` (prometheus-safe
//! version of "cmxsafe.io").
//!
//! # Metrics Categories
//!
//! - **Trigger Metrics** - Sensor events received and why they were skipped
//! - **Reconciliation Metrics** - Outcome and duration per reconciler
//! - **Resource Metrics** - Objects created, patched, and released from conflicts
//! - **Cache Metrics** - Index sizes and watch event throughput
//!
//! # Example
//!
//! ```rust,no_run
//! use cmxsafe_controller::metrics::{record_reconciliation_success, record_trigger};
//!
//! record_trigger("matched");
//! record_reconciliation_success("north_south", std::time::Duration::from_millis(12));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all cmxsafe metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "cmxsafe_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Trigger Metrics
// ============================================================================

/// Sensor events by outcome
///
/// Labels:
/// - `outcome`: `matched`, `ignored`, `signature_mismatch`, `no_pod_ip`, `no_user`
pub static TRIGGERS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_triggers_total"),
        "Total number of sensor events by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by component and status
///
/// Labels:
/// - `component`: `north_south`, `endpoint_slice`, `east_west`
/// - `status`: `success`, `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by component and status",
    );
    let counter = CounterVec::new(opts, &["component", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by component",
    )
    .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]);
    let histogram = HistogramVec::new(opts, &["component"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Reconciliation errors by component and reason code
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of reconciliation errors by component and reason",
    );
    let counter = CounterVec::new(opts, &["component", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Resource Metrics
// ============================================================================

/// Total number of objects created
///
/// Labels:
/// - `resource_type`: `Service` or `EndpointSlice`
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_created_total"),
        "Total number of resources created by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of patches sent
///
/// Labels:
/// - `resource_type`: `Service` or `EndpointSlice`
/// - `patch`: field set patched (e.g., `north-south`, `clear-hostname`)
pub static RESOURCES_PATCHED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_resources_patched_total"),
        "Total number of resources patched by type and field set",
    );
    let counter = CounterVec::new(opts, &["resource_type", "patch"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Competing objects stripped of the hostname annotation or service-name label
pub static CONFLICTS_RELEASED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_conflicts_released_total"),
        "Total number of competing objects released by type",
    );
    let counter = CounterVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Cache Metrics
// ============================================================================

/// Number of entries in each in-memory index
///
/// Labels:
/// - `index`: `pod` or `service`
pub static INDEX_ENTRIES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_index_entries"),
        "Number of entries in each in-memory index",
    );
    let gauge = GaugeVec::new(opts, &["index"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Watch events received
///
/// Labels:
/// - `resource`: `pod` or `service`
/// - `event`: `apply`, `delete`, `init`, `init_apply`, `init_done`, `error`
pub static WATCH_EVENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_watch_events_total"),
        "Total number of watch events by resource and event type",
    );
    let counter = CounterVec::new(opts, &["resource", "event"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record the outcome of a sensor event
pub fn record_trigger(outcome: &str) {
    TRIGGERS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a successful reconciliation
///
/// # Arguments
/// * `component` - Reconciler name (e.g., `north_south`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(component: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[component, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[component])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `component` - Reconciler name
/// * `reason` - Error reason code (see `status_reason()` on the error types)
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(component: &str, reason: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[component, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[component])
        .observe(duration.as_secs_f64());
    ERRORS_TOTAL.with_label_values(&[component, reason]).inc();
}

/// Record object creation
pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a patch
pub fn record_resource_patched(resource_type: &str, patch: &str) {
    RESOURCES_PATCHED_TOTAL
        .with_label_values(&[resource_type, patch])
        .inc();
}

/// Record a competing object released from a user's name
pub fn record_conflict_released(resource_type: &str) {
    CONFLICTS_RELEASED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Publish the current size of an index
#[allow(clippy::cast_precision_loss)]
pub fn set_index_size(index: &str, entries: usize) {
    INDEX_ENTRIES
        .with_label_values(&[index])
        .set(entries as f64);
}

/// Record a watch event
pub fn record_watch_event(resource: &str, event: &str) {
    WATCH_EVENTS_TOTAL
        .with_label_values(&[resource, event])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
