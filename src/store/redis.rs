//! Redis-backed list store.
//!
//! Uses a `ConnectionManager`, which multiplexes one connection and
//! reconnects on failure. Cloning it is cheap, so every call works on its
//! own clone.

use ::redis::AsyncCommands;
use ::redis::aio::ConnectionManager;

use super::{Batch, ListOp, ListStore, StoreError};

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = ::redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl ListStore for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn append_head(&self, list: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(list, value).await?;
        Ok(())
    }

    async fn range_read(&self, list: &str, from: i64, to: i64) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = conn.lrange(list, from as isize, to as isize).await?;
        Ok(values)
    }

    async fn pop_tail(&self, list: &str, count: usize) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        // RPOP with a count replies nil on a missing key.
        let values: Option<Vec<String>> = ::redis::cmd("RPOP")
            .arg(list)
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok(values.unwrap_or_default())
    }

    async fn move_tail_to_head(&self, list: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.rpoplpush(list, list).await?;
        Ok(value)
    }

    async fn len(&self, list: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(list).await?;
        Ok(len)
    }

    async fn execute(&self, batch: Batch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut pipe = ::redis::pipe();
        pipe.atomic();
        for op in batch.ops() {
            match op {
                ListOp::AppendHead(value) => {
                    pipe.cmd("LPUSH").arg(batch.list()).arg(value).ignore();
                }
                ListOp::PopTail(n) => {
                    pipe.cmd("RPOP").arg(batch.list()).arg(*n).ignore();
                }
                ListOp::MoveTailToHead => {
                    pipe.cmd("RPOPLPUSH")
                        .arg(batch.list())
                        .arg(batch.list())
                        .ignore();
                }
            }
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
