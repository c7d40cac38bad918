//! Metric instruments for queue activity.
//!
//! Instruments come from the globally registered `MeterProvider`, so they
//! are no-ops until a binary installs one via
//! [`init_telemetry`](super::init_telemetry).

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("redisq")
}

/// Counter: store calls made by a queue (push, scan, commit, rollback, len).
/// Labels: `queue`, `operation`, `result` ("ok" | "error" | "timeout").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("redisq.queue.operations")
        .with_description("Number of list store operations issued by queues")
        .build()
}

/// Counter: finished transactions.
/// Labels: `queue`, `outcome` ("commit" | "rollback" | "cancel" | "dropped" |
/// "abandoned", the last for a commit or rollback whose future was dropped).
pub fn transactions() -> Counter<u64> {
    meter()
        .u64_counter("redisq.queue.transactions")
        .with_description("Number of queue transactions by outcome")
        .build()
}

/// Histogram: store call duration in milliseconds.
/// Labels: `queue`, `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("redisq.operation.duration_ms")
        .with_description("List store operation duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Record one store call against all operation instruments.
pub fn record_operation(queue: &str, operation: &'static str, result: &'static str, ms: f64) {
    queue_operations().add(
        1,
        &[
            KeyValue::new("queue", queue.to_string()),
            KeyValue::new("operation", operation),
            KeyValue::new("result", result),
        ],
    );
    operation_duration_ms().record(
        ms,
        &[
            KeyValue::new("queue", queue.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

pub fn record_transaction(queue: &str, outcome: &'static str) {
    transactions().add(
        1,
        &[
            KeyValue::new("queue", queue.to_string()),
            KeyValue::new("outcome", outcome),
        ],
    );
}
