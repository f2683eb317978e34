//! Order queue. Hands claimed order ids from the webhook to background workers.
//!
//! The webhook acknowledges as soon as the id is pushed; generation runs here,
//! outside the request. Entries are bare order ids on a Redis list. Producers
//! `LPUSH`; a worker `BLMOVE`s the next entry onto its own in-flight list and
//! removes it from there only once the order has been dealt with. Entries a
//! crashed worker left in flight go back on the queue when it starts again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client as RedisClient;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::processor::{Dispatch, OrderProcessor};

/// How long one `BLMOVE` blocks before the worker loops.
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Queue entry is not an order id: {0}")]
    InvalidEntry(String),

    #[error("Entry left in flight: {0}")]
    Deferred(String),
}

#[async_trait]
pub trait OrderQueue: Send + Sync {
    async fn enqueue(&self, order_id: Uuid) -> Result<(), QueueError>;
}

/// One consumer's view of the queue.
#[async_trait]
pub trait WorkSource: Send {
    /// Moves the next entry onto this consumer's in-flight list and returns it.
    async fn claim(&mut self, wait: Duration) -> Result<Option<String>, QueueError>;

    /// Drops a finished entry from the in-flight list.
    async fn ack(&mut self, entry: &str) -> Result<(), QueueError>;

    /// Puts entries left in flight by an earlier run back on the queue.
    async fn recover(&mut self) -> Result<usize, QueueError>;
}

#[derive(Clone)]
pub struct RedisOrderQueue {
    client: RedisClient,
    key: String,
}

impl RedisOrderQueue {
    pub fn new(client: RedisClient, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }

    pub async fn consumer(&self, name: &str) -> Result<RedisConsumer, QueueError> {
        Ok(RedisConsumer {
            conn: self.client.get_multiplexed_async_connection().await?,
            key: self.key.clone(),
            in_flight: in_flight_key(&self.key, name),
        })
    }
}

#[async_trait]
impl OrderQueue for RedisOrderQueue {
    async fn enqueue(&self, order_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(order_id.to_string())
            .query_async::<_, ()>(&mut conn)
            .await?;
        info!(order_id = %order_id, queue = %self.key, "Order enqueued");
        Ok(())
    }
}

/// In-flight list of one consumer. Stable across restarts so leftovers can be found.
pub fn in_flight_key(queue_key: &str, consumer: &str) -> String {
    format!("{queue_key}:in-flight:{consumer}")
}

pub struct RedisConsumer {
    conn: MultiplexedConnection,
    key: String,
    in_flight: String,
}

#[async_trait]
impl WorkSource for RedisConsumer {
    async fn claim(&mut self, wait: Duration) -> Result<Option<String>, QueueError> {
        Ok(redis::cmd("BLMOVE")
            .arg(&self.key)
            .arg(&self.in_flight)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(wait.as_secs().max(1))
            .query_async(&mut self.conn)
            .await?)
    }

    async fn ack(&mut self, entry: &str) -> Result<(), QueueError> {
        redis::cmd("LREM")
            .arg(&self.in_flight)
            .arg(1)
            .arg(entry)
            .query_async::<_, ()>(&mut self.conn)
            .await?;
        Ok(())
    }

    async fn recover(&mut self) -> Result<usize, QueueError> {
        let mut moved = 0;
        // Oldest claim ends up at the tail, so it is popped first.
        loop {
            let entry: Option<String> = redis::cmd("LMOVE")
                .arg(&self.in_flight)
                .arg(&self.key)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut self.conn)
                .await?;
            if entry.is_none() {
                return Ok(moved);
            }
            moved += 1;
        }
    }
}

fn parse_entry(raw: &str) -> Result<Uuid, QueueError> {
    Uuid::parse_str(raw.trim()).map_err(|_| QueueError::InvalidEntry(raw.to_string()))
}

/// Claims one entry, dispatches it and acknowledges it.
///
/// Returns `false` when the wait elapsed with nothing to do. An entry whose
/// order could not be read stays in flight and the call fails with `Deferred`.
pub async fn handle_next<S: WorkSource + ?Sized>(
    source: &mut S,
    processor: &OrderProcessor,
    wait: Duration,
) -> Result<bool, QueueError> {
    let Some(entry) = source.claim(wait).await? else {
        return Ok(false);
    };

    match parse_entry(&entry) {
        Ok(order_id) => {
            info!(order_id = %order_id, "Processing order");
            if let Dispatch::StoreUnavailable(reason) = processor.process_claimed(order_id).await {
                return Err(QueueError::Deferred(reason));
            }
        }
        Err(e) => warn!("Dropping malformed queue entry: {e}"),
    }

    source.ack(&entry).await?;
    Ok(true)
}

/// Pops order ids forever and runs each through `OrderProcessor::process_claimed`.
/// Any queue failure drops the connection; after a short delay the worker
/// reconnects and recovers its in-flight entries before claiming new ones.
pub async fn run_worker(
    worker: usize,
    consumer: String,
    queue: RedisOrderQueue,
    processor: Arc<OrderProcessor>,
) {
    let name = format!("{consumer}-{worker}");
    info!(worker, consumer = %name, "Order worker started");
    loop {
        let mut source = match queue.consumer(&name).await {
            Ok(source) => source,
            Err(e) => {
                error!(worker, "Order worker could not connect: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        match source.recover().await {
            Ok(0) => {}
            Ok(moved) => warn!(worker, moved, "Requeued orders left in flight"),
            Err(e) => {
                error!(worker, "Could not recover in-flight orders: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        }

        loop {
            if let Err(e) = handle_next(&mut source, &processor, POLL_INTERVAL).await {
                error!(worker, "Order queue step failed: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                break;
            }
        }
    }
}

#[cfg(test)]
pub use fake::RecordingQueue;
