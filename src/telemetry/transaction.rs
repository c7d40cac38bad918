//! Transaction span helpers.
//!
//! Each transaction gets one span from begin to its terminal call, so the
//! scans and the outcome of a single read show up together.

use tracing::Span;
use uuid::Uuid;

/// Start a span for a queue transaction.
///
/// `tx.scanned` and `tx.outcome` are declared empty and filled in by
/// [`record_outcome`].
pub fn start_transaction_span(queue: &str, tx_id: &Uuid) -> Span {
    tracing::info_span!(
        "queue.transaction",
        "queue.name" = queue,
        "tx.id" = %tx_id,
        "tx.scanned" = tracing::field::Empty,
        "tx.outcome" = tracing::field::Empty,
    )
}

/// Record how a transaction ended and how many items it had scanned.
pub fn record_outcome(span: &Span, outcome: &str, scanned: u64) {
    span.record("tx.scanned", scanned);
    span.record("tx.outcome", outcome);
    span.in_scope(|| {
        tracing::debug!(outcome = outcome, scanned = scanned, "transaction finished");
    });
}
