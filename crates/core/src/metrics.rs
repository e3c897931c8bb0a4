//! Prometheus metrics for a run.
//!
//! This module provides metrics for:
//! - Dispatcher (commands routed, global sleeps)
//! - Workers (statement durations, aborts)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Dispatcher
// =============================================================================

/// Commands handled by the dispatcher, by kind.
pub static COMMANDS_DISPATCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "lockscope_commands_dispatched_total",
            "Total script commands handled by the dispatcher",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Global sleeps performed.
pub static SLEEPS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("lockscope_sleeps_total", "Total global SLEEP commands").unwrap()
});

// =============================================================================
// Workers
// =============================================================================

/// Workers ended by a database error.
pub static WORKER_ABORTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "lockscope_worker_aborts_total",
        "Total workers terminated by a database error",
    )
    .unwrap()
});

/// Time spent in database calls, by command kind.
pub static STATEMENT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "lockscope_statement_duration_seconds",
            "Duration of database calls made by workers",
        )
        .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        &["kind"],
    )
    .unwrap()
});

/// Registry holding every metric above.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    registry
        .register(Box::new(COMMANDS_DISPATCHED.clone()))
        .unwrap();
    registry.register(Box::new(SLEEPS.clone())).unwrap();
    registry.register(Box::new(WORKER_ABORTS.clone())).unwrap();
    registry
        .register(Box::new(STATEMENT_DURATION.clone()))
        .unwrap();
    registry
});

/// Text exposition of all metrics.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
