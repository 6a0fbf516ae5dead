//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauge
//! - Dispatched realtime events by event type and outcome
//! - Delivery failures that evicted a session

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "ws_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("parley"),
    )
    .expect("Failed to create WS_CONNECTIONS_ACTIVE metric")
});

/// Dispatched realtime events by event type and per-recipient outcome
pub static EVENTS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "events_dispatched_total",
            "Realtime events handed to recipient sessions",
        )
        .namespace("parley"),
        &["event", "outcome"], // outcome: "delivered" or "dropped"
    )
    .expect("Failed to create EVENTS_DISPATCHED_TOTAL metric")
});

/// Sessions evicted because their transport failed mid-send
pub static DELIVERY_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "delivery_failures_total",
            "Sends that failed and evicted the target session",
        )
        .namespace("parley"),
    )
    .expect("Failed to create DELIVERY_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WS_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_DISPATCHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DISPATCHED_TOTAL");
    registry
        .register(Box::new(DELIVERY_FAILURES_TOTAL.clone()))
        .expect("Failed to register DELIVERY_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to update the WebSocket connection count
pub fn set_ws_connections(count: usize) {
    WS_CONNECTIONS_ACTIVE.set(count as i64);
}

/// Helper to record a per-recipient dispatch outcome
pub fn record_event_dispatch(event: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "dropped" };
    EVENTS_DISPATCHED_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
}

/// Helper to record a send failure that evicted a session
pub fn record_delivery_failure() {
    DELIVERY_FAILURES_TOTAL.inc();
}
