//! # redisq
//!
//! Transactional FIFO work queue layered on a Redis list.
//!
//! Producers push items at the head of a list. A consumer opens a
//! transaction, scans pending items oldest first without removing them,
//! and then commits (removes them), rolls back (moves them to the head) or
//! cancels (leaves them as they were).
//!
//! ```ignore
//! let store = Arc::new(RedisStore::connect("redis://127.0.0.1:6379").await?);
//! let queue = Queue::connect(store, Job::default(), QueueConfig::new("jobs")).await?;
//!
//! queue.push(&Job { name: "a".into() }).await?;
//!
//! let mut tx = queue.begin_read().await?;
//! let job = tx.scan_next().await?;
//! match handle(&job).await {
//!     Ok(()) => tx.commit().await?,
//!     Err(_) => tx.rollback().await?,
//! }
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod queue;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
pub use item::{Item, ItemError, JsonItem};
pub use queue::{BeginMode, Queue, QueueConfig, Transaction};
pub use store::{Batch, ListOp, ListStore, MemoryStore, RedisStore, StoreError};
