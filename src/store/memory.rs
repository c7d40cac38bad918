//! In-process list store with Redis list semantics.
//!
//! Backs the test suite and local runs without a Redis server. All lists
//! live behind one mutex, which also makes [`Batch`] execution atomic.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Batch, ListOp, ListStore, StoreError};

/// Lists keyed by name. Front of each deque is the head, back is the tail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Copy of a list, head first.
    pub fn snapshot(&self, list: &str) -> Vec<String> {
        self.lock()
            .get(list)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<String>>> {
        // A poisoned map is still structurally valid; every op leaves it
        // consistent before it can panic.
        self.lists.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

/// Resolve an LRANGE index pair against a list of `len` elements.
fn resolve_range(len: usize, from: i64, to: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if from < 0 { (len + from).max(0) } else { from };
    let stop = if to < 0 { len + to } else { to.min(len - 1) };
    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn apply(lists: &mut HashMap<String, VecDeque<String>>, list: &str, op: &ListOp) {
    match op {
        ListOp::AppendHead(value) => {
            lists
                .entry(list.to_string())
                .or_default()
                .push_front(value.clone());
        }
        ListOp::PopTail(n) => {
            pop_tail(lists, list, *n);
        }
        ListOp::MoveTailToHead => {
            move_tail_to_head(lists, list);
        }
    }
}

fn pop_tail(lists: &mut HashMap<String, VecDeque<String>>, list: &str, n: usize) -> Vec<String> {
    let Some(l) = lists.get_mut(list) else {
        return Vec::new();
    };
    let take = n.min(l.len());
    let popped: Vec<String> = (0..take).filter_map(|_| l.pop_back()).collect();
    if l.is_empty() {
        lists.remove(list);
    }
    popped
}

fn move_tail_to_head(lists: &mut HashMap<String, VecDeque<String>>, list: &str) -> Option<String> {
    let l = lists.get_mut(list)?;
    let value = l.pop_back()?;
    l.push_front(value.clone());
    Some(value)
}

impl ListStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn append_head(&self, list: &str, value: String) -> Result<(), StoreError> {
        self.check_online()?;
        apply(&mut self.lock(), list, &ListOp::AppendHead(value));
        Ok(())
    }

    async fn range_read(&self, list: &str, from: i64, to: i64) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        let lists = self.lock();
        let Some(l) = lists.get(list) else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(l.len(), from, to) {
            Some((start, stop)) => l.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    async fn pop_tail(&self, list: &str, count: usize) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        Ok(pop_tail(&mut self.lock(), list, count))
    }

    async fn move_tail_to_head(&self, list: &str) -> Result<Option<String>, StoreError> {
        self.check_online()?;
        Ok(move_tail_to_head(&mut self.lock(), list))
    }

    async fn len(&self, list: &str) -> Result<usize, StoreError> {
        self.check_online()?;
        Ok(self.lock().get(list).map_or(0, VecDeque::len))
    }

    async fn execute(&self, batch: Batch) -> Result<(), StoreError> {
        self.check_online()?;
        let mut lists = self.lock();
        for op in batch.ops() {
            apply(&mut lists, batch.list(), op);
        }
        Ok(())
    }
}
