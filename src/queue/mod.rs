//! Transactional FIFO queue over a [`ListStore`] list.
//!
//! Producers [`push`](Queue::push) at the head of the list at any time. A
//! consumer opens a [`Transaction`] with [`begin_read`](Queue::begin_read),
//! scans items oldest first without removing them, and then ends the
//! transaction in one of three ways:
//!
//! - **commit** pops every scanned item off the tail;
//! - **rollback** moves every scanned item from the tail to the head, one
//!   RPOPLPUSH at a time in a single atomic pipeline. The rolled-back items
//!   become the newest ones; a later transaction reaches them after every
//!   older item and scans them in their original order (listed head first,
//!   they appear reversed);
//! - **cancel** touches nothing; the next transaction sees the same items
//!   in the same order.
//!
//! One queue handle allows one open transaction. In [`BeginMode::Block`] a
//! second `begin_read` waits for the first transaction to end (calling it
//! twice from the same task therefore waits forever). In
//! [`BeginMode::Error`] it fails with [`Error::AlreadyInTransaction`].
//!
//! Commit and rollback always end the transaction, even when the store call
//! fails or times out. A failed commit or rollback is ambiguous: the list
//! may or may not have changed, and callers that need exactly-once delivery
//! must re-check it.

mod transaction;

pub use transaction::Transaction;

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::store::{ListStore, StoreError};
use crate::telemetry::metrics;

/// What `begin_read` does while another transaction is open.
///
/// Spelled `"block"` or `"error"`, exactly, both in the environment and in
/// TOML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeginMode {
    /// Wait for the open transaction to end.
    #[default]
    Block,
    /// Fail with [`Error::AlreadyInTransaction`].
    Error,
}

impl FromStr for BeginMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "block" => Ok(BeginMode::Block),
            "error" => Ok(BeginMode::Error),
            other => Err(Error::Config(format!(
                "unknown begin mode {other:?} (expected \"block\" or \"error\")"
            ))),
        }
    }
}

impl std::fmt::Display for BeginMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BeginMode::Block => write!(f, "block"),
            BeginMode::Error => write!(f, "error"),
        }
    }
}

/// Construction parameters for a [`Queue`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Name of the backing list. One handle per name.
    pub name: String,
    #[serde(default)]
    pub begin_mode: BeginMode,
    /// Limit applied to every store call. `None` waits indefinitely.
    #[serde(default, rename = "op_timeout_ms", deserialize_with = "millis")]
    pub op_timeout: Option<Duration>,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn begin_mode(mut self, mode: BeginMode) -> Self {
        self.begin_mode = mode;
        self
    }

    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = Some(timeout);
        self
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// name = "jobs"
    /// begin_mode = "error"
    /// op_timeout_ms = 500
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid queue config: {e}")))
    }
}

fn millis<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(de)?.map(Duration::from_millis))
}

/// Per-handle transaction state, guarded by the transaction lock.
#[derive(Debug, Default)]
pub(crate) struct TxState {
    /// Items scanned and not yet committed or rolled back.
    pub(crate) scan_count: u64,
}

/// A FIFO queue of `T` stored in the list `name` of store `S`.
pub struct Queue<T, S> {
    store: Arc<S>,
    name: String,
    type_tag: Cow<'static, str>,
    begin_mode: BeginMode,
    op_timeout: Option<Duration>,
    tx: Mutex<TxState>,
    active: AtomicBool,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> std::fmt::Debug for Queue<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .field("begin_mode", &self.begin_mode)
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}

impl<T: Item, S: ListStore> Queue<T, S> {
    /// Validate `config`, probe the store, and build the handle.
    ///
    /// `witness` is a representative item; its [`Item::type_tag`] is the only
    /// tag [`push`](Self::push) accepts afterwards.
    pub async fn connect(store: Arc<S>, witness: T, config: QueueConfig) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(Error::Config("queue name must not be empty".to_string()));
        }

        let probe = store.ping();
        let probed = match config.op_timeout {
            Some(limit) => tokio::time::timeout(limit, probe)
                .await
                .unwrap_or_else(|_| {
                    Err(StoreError::Unavailable(format!("no reply within {limit:?}")))
                }),
            None => probe.await,
        };
        probed.map_err(|e| Error::Config(format!("list store is not reachable: {e}")))?;

        debug!(queue = %config.name, mode = %config.begin_mode, "queue ready");

        Ok(Self {
            store,
            name: config.name,
            type_tag: witness.type_tag(),
            begin_mode: config.begin_mode,
            op_timeout: config.op_timeout,
            tx: Mutex::new(TxState::default()),
            active: AtomicBool::new(false),
            _item: PhantomData,
        })
    }

    /// Encode `item` and append it at the head of the list.
    ///
    /// Independent of transactions: safe to call while one is open, from any
    /// task.
    pub async fn push(&self, item: &T) -> Result<()> {
        let tag = item.type_tag();
        if tag != self.type_tag {
            return Err(Error::WrongType {
                expected: self.type_tag.to_string(),
                actual: tag.into_owned(),
            });
        }

        let text = item.encode().map_err(Error::Serialization)?;
        self.call("lpush", self.store.append_head(&self.name, text)).await?;
        debug!(queue = %self.name, "item pushed");
        Ok(())
    }

    /// Open a transaction, honouring the configured [`BeginMode`].
    pub async fn begin_read(&self) -> Result<Transaction<'_, T, S>> {
        let guard = match self.begin_mode {
            BeginMode::Block => self.tx.lock().await,
            BeginMode::Error => self
                .tx
                .try_lock()
                .map_err(|_| Error::AlreadyInTransaction)?,
        };
        Ok(Transaction::open(self, guard))
    }

    /// Number of items currently in the backing list, scanned or not.
    pub async fn len(&self) -> Result<usize> {
        self.call("llen", self.store.len(&self.name)).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

impl<T, S> Queue<T, S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn begin_mode(&self) -> BeginMode {
        self.begin_mode
    }

    /// Whether a transaction is open on this handle right now.
    pub fn in_transaction(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Run one store call under the configured timeout, tagging any failure
    /// with `op` and recording it in the operation metrics.
    pub(crate) async fn call<R>(
        &self,
        op: &'static str,
        fut: impl Future<Output = std::result::Result<R, StoreError>>,
    ) -> Result<R> {
        let started = Instant::now();
        let result = match self.op_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(res) => res.map_err(|source| Error::Store { op, source }),
                Err(_) => Err(Error::Timeout { op, timeout: limit }),
            },
            None => fut.await.map_err(|source| Error::Store { op, source }),
        };

        let label = match &result {
            Ok(_) => "ok",
            Err(Error::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::record_operation(
            &self.name,
            op,
            label,
            started.elapsed().as_secs_f64() * 1000.0,
        );
        result
    }
}
