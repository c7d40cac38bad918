//! redisq CLI: operator interface to a transactional queue.
//!
//! Items are handled as raw JSON values, so any queue whose items are
//! stored as JSON can be inspected.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use redisq::config::Config;
use redisq::config::secrets::ExposeSecret;
use redisq::telemetry::{TelemetryConfig, init_telemetry};
use redisq::{Queue, RedisStore, Transaction};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "redisq", about = "Transactional FIFO queue on a Redis list")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Push a JSON item at the head of the queue
    Push {
        /// Item as a JSON document
        json: String,
    },
    /// Show the oldest items without removing them
    Peek {
        /// Maximum items to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Remove and print the oldest items
    Take {
        /// Maximum items to take
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Move the oldest items to the head of the queue
    Requeue {
        /// Maximum items to move
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Print the number of items in the queue
    Len,
}

type JsonQueue = Queue<Value, RedisStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "redisq".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let store = Arc::new(RedisStore::connect(config.redis_url.expose_secret()).await?);
    let queue: JsonQueue = Queue::connect(store, Value::Null, config.queue).await?;

    match cli.command {
        Command::Push { json } => cmd_push(&queue, &json).await,
        Command::Peek { count } => {
            let mut tx = queue.begin_read().await?;
            print_scanned(&mut tx, count).await?;
            tx.cancel()?;
            Ok(())
        }
        Command::Take { count } => {
            let mut tx = queue.begin_read().await?;
            let n = print_scanned(&mut tx, count).await?;
            tx.commit().await?;
            println!("\n{n} item(s) removed");
            Ok(())
        }
        Command::Requeue { count } => {
            let mut tx = queue.begin_read().await?;
            let n = tx_skip(&mut tx, count).await?;
            tx.rollback().await?;
            println!("{n} item(s) moved to the head");
            Ok(())
        }
        Command::Len => {
            println!("{}", queue.len().await?);
            Ok(())
        }
    }
}

async fn cmd_push(queue: &JsonQueue, json: &str) -> anyhow::Result<()> {
    let item: Value = serde_json::from_str(json)?;
    queue.push(&item).await?;
    println!("pushed to {}", queue.name());
    Ok(())
}

/// Scan up to `count` items, printing each. Stops early when the queue runs
/// out.
async fn print_scanned(
    tx: &mut Transaction<'_, Value, RedisStore>,
    count: usize,
) -> anyhow::Result<u64> {
    for _ in 0..count {
        match tx.scan_next().await {
            Ok(item) => println!("{}", serde_json::to_string(&item)?),
            Err(e) if e.is_not_found() => break,
            Err(e) => return Err(e.into()),
        }
    }
    if tx.scan_count() == 0 {
        println!("Queue is empty.");
    }
    Ok(tx.scan_count())
}

async fn tx_skip(tx: &mut Transaction<'_, Value, RedisStore>, count: usize) -> anyhow::Result<u64> {
    for _ in 0..count {
        match tx.scan_next().await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(tx.scan_count())
}
