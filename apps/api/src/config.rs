use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub stripe_webhook_secret: String,
    pub port: u16,
    pub rust_log: String,
    /// Price of one optimization in minor currency units.
    pub order_price_cents: i64,
    /// Redis list the webhook pushes claimed order ids onto.
    pub order_queue_key: String,
    /// Number of background workers popping the order queue.
    pub order_workers: usize,
    /// Names this instance's in-flight lists; must survive restarts of the same instance.
    pub queue_consumer: String,
    /// Maximum age of a signed webhook before it is rejected as a replay.
    pub webhook_tolerance: Duration,
    pub timeouts: StepTimeouts,
}

/// Upper bounds for the network-bound steps of the order pipeline.
#[derive(Debug, Clone, Copy)]
pub struct StepTimeouts {
    pub download: Duration,
    pub generation: Duration,
    pub upload: Duration,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            download: Duration::from_secs(30),
            generation: Duration::from_secs(180),
            upload: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            stripe_webhook_secret: require_env("STRIPE_WEBHOOK_SECRET")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            order_price_cents: optional_env("ORDER_PRICE_CENTS", 4900)?,
            order_queue_key: std::env::var("ORDER_QUEUE_KEY")
                .unwrap_or_else(|_| "orders:pending".to_string()),
            order_workers: optional_env("ORDER_WORKERS", 2)?,
            queue_consumer: std::env::var("QUEUE_CONSUMER")
                .or_else(|_| std::env::var("HOSTNAME"))
                .unwrap_or_else(|_| "resume-api".to_string()),
            webhook_tolerance: Duration::from_secs(optional_env("WEBHOOK_TOLERANCE_SECS", 300)?),
            timeouts: StepTimeouts {
                download: Duration::from_secs(optional_env("DOWNLOAD_TIMEOUT_SECS", 30)?),
                generation: Duration::from_secs(optional_env("GENERATION_TIMEOUT_SECS", 180)?),
                upload: Duration::from_secs(optional_env("UPLOAD_TIMEOUT_SECS", 30)?),
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for handler tests; external URLs are never dialed.
    pub fn for_tests(webhook_secret: &str) -> Self {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            redis_url: "redis://localhost".to_string(),
            s3_bucket: "resumes".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            anthropic_api_key: "test".to_string(),
            stripe_webhook_secret: webhook_secret.to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            order_price_cents: 4900,
            order_queue_key: "orders:pending".to_string(),
            order_workers: 1,
            queue_consumer: "test".to_string(),
            webhook_tolerance: Duration::from_secs(300),
            timeouts: StepTimeouts::default(),
        }
    }
}
