//! Queue tests against a live Redis server.
//!
//! Run with:
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_test -- --ignored
//! ```

use std::sync::Arc;

use redisq::{BeginMode, Error, JsonItem, Queue, QueueConfig, RedisStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Job {
    name: String,
    #[serde(default)]
    age: u32,
}

impl JsonItem for Job {}

fn job(name: &str) -> Job {
    Job {
        name: name.to_string(),
        age: 0,
    }
}

/// Helper: connect a queue on a fresh list name so runs never collide.
async fn test_queue(mode: BeginMode) -> Queue<Job, RedisStore> {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = Arc::new(RedisStore::connect(&url).await.unwrap());
    let name = format!("redisq-test-{}", uuid::Uuid::new_v4());
    Queue::connect(store, Job::default(), QueueConfig::new(name).begin_mode(mode))
        .await
        .unwrap()
}

/// Commit whatever is left so the test list is removed.
async fn cleanup(queue: &Queue<Job, RedisStore>) {
    let mut tx = queue.begin_read().await.unwrap();
    while tx.scan_next().await.is_ok() {}
    tx.commit().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn push_scan_commit() {
    let queue = test_queue(BeginMode::Block).await;
    queue.push(&job("a")).await.unwrap();
    queue.push(&job("b")).await.unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    assert_eq!(tx.scan_next().await.unwrap(), job("a"));
    assert_eq!(tx.scan_next().await.unwrap(), job("b"));
    assert!(tx.scan_next().await.unwrap_err().is_not_found());
    tx.commit().await.unwrap();

    assert_eq!(queue.len().await.unwrap(), 0);
    assert!(matches!(tx.commit().await, Err(Error::NoTransaction)));
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn rollback_requeues_scanned_items_behind_older_ones() {
    let queue = test_queue(BeginMode::Block).await;
    for name in ["a", "b", "c"] {
        queue.push(&job(name)).await.unwrap();
    }

    let mut tx = queue.begin_read().await.unwrap();
    tx.scan_next().await.unwrap();
    tx.scan_next().await.unwrap();
    tx.rollback().await.unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    assert_eq!(tx.scan_next().await.unwrap(), job("c"));
    assert_eq!(tx.scan_next().await.unwrap(), job("a"));
    assert_eq!(tx.scan_next().await.unwrap(), job("b"));
    tx.cancel().unwrap();

    cleanup(&queue).await;
}

#[tokio::test]
#[ignore] // Requires running Redis
async fn cancel_keeps_items_in_order() {
    let queue = test_queue(BeginMode::Error).await;
    queue.push(&job("a")).await.unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    assert!(matches!(
        queue.begin_read().await,
        Err(Error::AlreadyInTransaction)
    ));
    assert_eq!(tx.scan_next().await.unwrap(), job("a"));
    tx.cancel().unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    assert_eq!(tx.scan_next().await.unwrap(), job("a"));
    tx.commit().await.unwrap();
}
