//! Ordered-list store the queue is layered on.
//!
//! A list has a head (where pushes land) and a tail (the oldest element).
//! Indices follow Redis LRANGE rules: `0` is the head, `-1` the tail.
//!
//! Multi-step mutations go through [`Batch`]: build it, then hand it to
//! [`ListStore::execute`], which applies every op or none. A batch that is
//! dropped without being executed has no effect.

pub mod memory;
pub mod redis;

use std::future::Future;

use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Failure reported by a list store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One step of a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOp {
    /// Insert a value in front of the head.
    AppendHead(String),
    /// Remove up to `n` elements from the tail.
    PopTail(usize),
    /// Move the tail element to the head.
    MoveTailToHead,
}

/// A sequence of ops against one list, applied atomically by
/// [`ListStore::execute`].
#[derive(Debug, Clone)]
pub struct Batch {
    list: String,
    ops: Vec<ListOp>,
}

impl Batch {
    pub fn new(list: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            ops: Vec::new(),
        }
    }

    /// Enqueue an op.
    pub fn push(mut self, op: ListOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Enqueue `n` tail-to-head moves.
    pub fn move_tail_to_head(mut self, n: usize) -> Self {
        self.ops.extend(std::iter::repeat_n(ListOp::MoveTailToHead, n));
        self
    }

    pub fn list(&self) -> &str {
        &self.list
    }

    pub fn ops(&self) -> &[ListOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Remote ordered-list service.
///
/// Implementations must be safe to share between tasks; the queue calls them
/// concurrently from pushes and from the transaction holder.
pub trait ListStore: Send + Sync {
    /// Liveness probe used at queue construction.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// LPUSH.
    fn append_head(
        &self,
        list: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// LRANGE, inclusive on both ends.
    fn range_read(
        &self,
        list: &str,
        from: i64,
        to: i64,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Counted RPOP. Returns the removed values, tail first.
    fn pop_tail(
        &self,
        list: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// RPOPLPUSH with the same list as source and destination.
    fn move_tail_to_head(
        &self,
        list: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// LLEN.
    fn len(&self, list: &str) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Apply every op in `batch` in one atomic round trip.
    fn execute(&self, batch: Batch) -> impl Future<Output = Result<(), StoreError>> + Send;
}
