use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::MutexGuard;
use tracing::{Instrument, Span, debug, warn};
use uuid::Uuid;

use super::{Queue, TxState};
use crate::error::{Error, Result};
use crate::item::Item;
use crate::store::{Batch, ListStore};
use crate::telemetry::metrics;
use crate::telemetry::transaction::{record_outcome, start_transaction_span};

/// The transaction lock plus the flag mirroring it.
///
/// Dropping it closes the transaction: the outcome is recorded, the scan
/// count goes back to zero and the lock is released, whichever path got us
/// here (terminal call, error, timeout, or a dropped future).
struct Held<'q> {
    state: MutexGuard<'q, TxState>,
    active: &'q AtomicBool,
    queue: &'q str,
    span: Span,
    /// Outcome reported on drop. Terminal calls overwrite it.
    outcome: &'static str,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        record_outcome(&self.span, self.outcome, self.state.scan_count);
        metrics::record_transaction(self.queue, self.outcome);
        self.state.scan_count = 0;
        self.active.store(false, Ordering::SeqCst);
    }
}

/// An open read transaction on a [`Queue`].
///
/// Only the holder of this ticket can scan, commit, roll back or cancel.
/// After a terminal call the ticket is spent and every further call fails
/// with [`Error::NoTransaction`]. Dropping an open ticket cancels it.
pub struct Transaction<'q, T, S> {
    queue: &'q Queue<T, S>,
    held: Option<Held<'q>>,
    id: Uuid,
    span: Span,
}

impl<'q, T, S> Transaction<'q, T, S> {
    pub(super) fn open(queue: &'q Queue<T, S>, mut state: MutexGuard<'q, TxState>) -> Self {
        state.scan_count = 0;
        queue.active.store(true, Ordering::SeqCst);

        let id = Uuid::new_v4();
        let span = start_transaction_span(&queue.name, &id);
        span.in_scope(|| debug!("transaction opened"));

        Self {
            queue,
            held: Some(Held {
                state,
                active: &queue.active,
                queue: &queue.name,
                span: span.clone(),
                outcome: "dropped",
            }),
            id,
            span,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the transaction is still open.
    pub fn is_active(&self) -> bool {
        self.held.is_some()
    }

    /// Items scanned so far; zero once the transaction has ended.
    pub fn scan_count(&self) -> u64 {
        self.held.as_ref().map_or(0, |h| h.state.scan_count)
    }

    /// End the transaction without touching the list.
    pub fn cancel(&mut self) -> Result<()> {
        let mut held = self.held.take().ok_or(Error::NoTransaction)?;
        held.outcome = "cancel";
        Ok(())
    }

    /// Take the lock out of the ticket for a terminal call.
    ///
    /// Until the call sets its own outcome, a drop (the caller abandoned the
    /// future mid-flight) is reported as "abandoned".
    fn close(&mut self) -> Result<Held<'q>> {
        let mut held = self.held.take().ok_or(Error::NoTransaction)?;
        held.outcome = "abandoned";
        Ok(held)
    }
}

impl<'q, T: Item, S: ListStore> Transaction<'q, T, S> {
    /// Read the next unscanned item, oldest first, into `item`.
    ///
    /// The item stays in the list. If there is nothing at the next position
    /// the call fails with [`Error::NotFound`] and the scan count is left
    /// alone, so a later scan retries the same position. A decode failure,
    /// store error, timeout or dropped future leaves the count alone too.
    pub async fn scan(&mut self, item: &mut T) -> Result<()> {
        let scanned = self
            .held
            .as_ref()
            .ok_or(Error::NoTransaction)?
            .state
            .scan_count;
        let position = -(scanned as i64 + 1);

        let queue = self.queue;
        let values = queue
            .call("lrange", queue.store.range_read(&queue.name, position, position))
            .instrument(self.span.clone())
            .await?;

        let Some(text) = values.into_iter().next() else {
            return Err(Error::NotFound {
                list: queue.name.clone(),
                position,
            });
        };
        item.decode(&text).map_err(Error::Deserialization)?;

        if let Some(held) = self.held.as_mut() {
            held.state.scan_count += 1;
        }
        Ok(())
    }

    /// [`scan`](Self::scan) into a fresh `T::default()` and return it.
    pub async fn scan_next(&mut self) -> Result<T>
    where
        T: Default,
    {
        let mut item = T::default();
        self.scan(&mut item).await?;
        Ok(item)
    }

    /// Pop every scanned item off the tail and end the transaction.
    ///
    /// The transaction ends even if the pop fails; the error is returned and
    /// the list state is then unknown.
    pub async fn commit(&mut self) -> Result<()> {
        let mut held = self.close()?;
        let scanned = held.state.scan_count;

        let result = if scanned == 0 {
            Ok(())
        } else {
            let queue = self.queue;
            queue
                .call("rpop", queue.store.pop_tail(&queue.name, scanned as usize))
                .instrument(self.span.clone())
                .await
                .map(|popped| {
                    if popped.len() as u64 != scanned {
                        warn!(
                            queue = %queue.name,
                            scanned,
                            popped = popped.len(),
                            "commit popped a different number of items than were scanned"
                        );
                    }
                })
        };

        held.outcome = "commit";
        self.settle(held, result)
    }

    /// Move every scanned item from the tail to the head and end the
    /// transaction.
    ///
    /// Each move takes the current tail and puts it at the head, so a FIFO
    /// consumer later sees the rolled-back items in their original order,
    /// after everything that was already queued behind them. Listed head
    /// first, they appear reversed. All moves run as one atomic batch. As
    /// with commit, the transaction ends even if the batch fails.
    pub async fn rollback(&mut self) -> Result<()> {
        let mut held = self.close()?;
        let scanned = held.state.scan_count;

        let result = if scanned == 0 {
            Ok(())
        } else {
            let queue = self.queue;
            let batch = Batch::new(queue.name.clone()).move_tail_to_head(scanned as usize);
            queue
                .call("pipeline.exec", queue.store.execute(batch))
                .instrument(self.span.clone())
                .await
        };

        held.outcome = "rollback";
        self.settle(held, result)
    }

    fn settle(&self, held: Held<'q>, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.span.in_scope(|| {
                warn!(
                    error = %e,
                    outcome = held.outcome,
                    "transaction ended with a store failure"
                );
            });
        }
        drop(held);
        result
    }
}
