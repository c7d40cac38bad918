//! Integration tests for telemetry initialization and span helpers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redisq::{Batch, ListStore, MemoryStore, Queue, QueueConfig, StoreError};
use serde_json::{Value, json};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use uuid::Uuid;

type Fields = HashMap<&'static str, String>;

/// Layer that keeps the fields of every event it sees.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<Fields>>>);

impl Captured {
    /// Events emitted when a transaction ends, oldest first.
    fn finished(&self) -> Vec<Fields> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.get("message").is_some_and(|m| m == "transaction finished"))
            .cloned()
            .collect()
    }
}

struct Recorder<'a>(&'a mut Fields);

impl Visit for Recorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::new();
        event.record(&mut Recorder(&mut fields));
        self.0.lock().unwrap().push(fields);
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(captured.clone()));
    (captured, guard)
}

#[test]
fn telemetry_initializes_without_endpoint() {
    // The global subscriber can only be set once per process; a second
    // init returning Err is acceptable.
    let config = redisq::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "redisq-test".to_string(),
        log_level: "debug".to_string(),
    };
    let _guard = redisq::telemetry::init_telemetry(config);
}

#[test]
fn transaction_span_records_outcome() {
    let (captured, _default) = capture();

    let id = Uuid::new_v4();
    let span = redisq::telemetry::transaction::start_transaction_span("jobs", &id);
    redisq::telemetry::transaction::record_outcome(&span, "commit", 3);

    let finished = captured.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0]["outcome"], "commit");
    assert_eq!(finished[0]["scanned"], "3");
}

#[tokio::test]
async fn queue_operations_work_without_meter_provider() {
    let queue = Queue::connect(
        Arc::new(MemoryStore::new()),
        Value::Null,
        QueueConfig::new("telemetry"),
    )
    .await
    .unwrap();
    queue.push(&json!({"name": "a"})).await.unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    let item = tx.scan_next().await.unwrap();
    assert_eq!(item["name"], "a");
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn every_way_out_of_a_transaction_is_recorded() {
    let (captured, _default) = capture();

    let queue = Queue::connect(
        Arc::new(MemoryStore::new()),
        Value::Null,
        QueueConfig::new("outcomes"),
    )
    .await
    .unwrap();
    for name in ["a", "b"] {
        queue.push(&json!({ "name": name })).await.unwrap();
    }

    let mut tx = queue.begin_read().await.unwrap();
    tx.scan_next().await.unwrap();
    tx.cancel().unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    tx.scan_next().await.unwrap();
    tx.scan_next().await.unwrap();
    drop(tx);

    let mut tx = queue.begin_read().await.unwrap();
    tx.scan_next().await.unwrap();
    tx.rollback().await.unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    tx.scan_next().await.unwrap();
    tx.commit().await.unwrap();

    let seen: Vec<(String, String)> = captured
        .finished()
        .iter()
        .map(|f| (f["outcome"].clone(), f["scanned"].clone()))
        .collect();
    let expected = [("cancel", "1"), ("dropped", "2"), ("rollback", "1"), ("commit", "1")];
    assert_eq!(
        seen,
        expected.map(|(o, n)| (o.to_string(), n.to_string())).to_vec()
    );
}

/// Memory store whose batches never complete.
struct StalledStore(MemoryStore);

impl ListStore for StalledStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.0.ping().await
    }

    async fn append_head(&self, list: &str, value: String) -> Result<(), StoreError> {
        self.0.append_head(list, value).await
    }

    async fn range_read(&self, list: &str, from: i64, to: i64) -> Result<Vec<String>, StoreError> {
        self.0.range_read(list, from, to).await
    }

    async fn pop_tail(&self, list: &str, count: usize) -> Result<Vec<String>, StoreError> {
        self.0.pop_tail(list, count).await
    }

    async fn move_tail_to_head(&self, list: &str) -> Result<Option<String>, StoreError> {
        self.0.move_tail_to_head(list).await
    }

    async fn len(&self, list: &str) -> Result<usize, StoreError> {
        self.0.len(list).await
    }

    async fn execute(&self, _batch: Batch) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn abandoned_rollback_is_recorded() {
    let (captured, _default) = capture();

    let queue = Queue::connect(
        Arc::new(StalledStore(MemoryStore::new())),
        Value::Null,
        QueueConfig::new("stalled"),
    )
    .await
    .unwrap();
    queue.push(&json!({"name": "a"})).await.unwrap();

    let mut tx = queue.begin_read().await.unwrap();
    tx.scan_next().await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_millis(20), tx.rollback()).await;
    assert!(outcome.is_err(), "rollback should still be in flight");
    assert!(!queue.in_transaction());

    let finished = captured.finished();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0]["outcome"], "abandoned");
    assert_eq!(finished[0]["scanned"], "1");
}
