//! Error types for redisq.

use std::time::Duration;

use thiserror::Error;

use crate::item::ItemError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("item type mismatch: queue holds {expected}, got {actual}")]
    WrongType { expected: String, actual: String },

    #[error("no transaction in progress")]
    NoTransaction,

    #[error("transaction already in progress")]
    AlreadyInTransaction,

    #[error("no element at position {position} of list {list}")]
    NotFound { list: String, position: i64 },

    #[error("failed to serialize item: {0}")]
    Serialization(#[source] ItemError),

    #[error("failed to deserialize item: {0}")]
    Deserialization(#[source] ItemError),

    #[error("{op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{op}: timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when a scan ran off the end of the list.
    ///
    /// Read-to-end loops use this to stop; it is not a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
