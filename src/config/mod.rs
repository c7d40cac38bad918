//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. The Redis URL may carry a password, so it is wrapped in
//! `secrecy::SecretString` to keep it out of logs.

pub mod secrets;

use std::time::Duration;

use crate::error::{Error, Result};
use crate::queue::{BeginMode, QueueConfig};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Config {
    pub redis_url: SecretString,
    pub queue: QueueConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let begin_mode = match std::env::var("QUEUE_BEGIN_MODE") {
            Ok(mode) => mode.parse::<BeginMode>()?,
            Err(_) => BeginMode::default(),
        };
        let op_timeout = match std::env::var("QUEUE_OP_TIMEOUT_MS") {
            Ok(ms) => Some(Duration::from_millis(ms.parse().map_err(|_| {
                Error::Config(format!("QUEUE_OP_TIMEOUT_MS is not a number: {ms}"))
            })?)),
            Err(_) => None,
        };

        Ok(Self {
            redis_url: SecretString::from(required_var("REDIS_URL")?),
            queue: QueueConfig {
                name: required_var("QUEUE_NAME")?,
                begin_mode,
                op_timeout,
            },
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}
