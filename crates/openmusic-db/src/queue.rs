//! Durable named queues stored in the same SQLite file as the catalog.
//!
//! The API process publishes and the export consumer receives; they share
//! nothing but the database file. Messages are handed out oldest first.

use std::sync::Arc;
use std::time::Duration;

use rusqlite::OptionalExtension;
use tracing::debug;

use crate::{Database, Error, Result, now};

/// When a received message stops being redeliverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Removed from the queue as it is handed out. A crash or failure while
    /// processing loses the message (at-most-once).
    Auto,
    /// Leased on receipt and removed by [`QueueTransport::ack`]. A lease that
    /// expires unacknowledged makes the message deliverable again.
    Manual,
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: i64,
    pub queue: String,
    pub payload: Vec<u8>,
}

pub trait QueueTransport: Send + Sync {
    /// Create the queue if it does not exist yet.
    fn declare(&self, queue: &str) -> Result<()>;

    /// Append a message. The queue must have been declared.
    fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;

    /// Next deliverable message, or `None` if the queue is idle.
    fn receive(&self, queue: &str, mode: AckMode) -> Result<Option<Delivery>>;

    /// Acknowledge a message received in [`AckMode::Manual`].
    fn ack(&self, delivery: &Delivery) -> Result<()>;
}

const DEFAULT_LEASE: Duration = Duration::from_secs(300);

pub struct SqliteQueue {
    db: Arc<Database>,
    lease: Duration,
}

impl SqliteQueue {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            lease: DEFAULT_LEASE,
        }
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Messages still in the queue, leased or not.
    pub fn depth(&self, queue: &str) -> Result<usize> {
        self.db.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM queue_messages WHERE queue = ?1",
                [queue],
                |r| r.get(0),
            )?;
            Ok(n as usize)
        })
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl QueueTransport for SqliteQueue {
    fn declare(&self, queue: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO queues (name, created_at) VALUES (?1, ?2)",
                (queue, now()),
            )?;
            Ok(())
        })
    }

    fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        self.db.with_tx(|conn| {
            let declared = conn
                .query_row("SELECT 1 FROM queues WHERE name = ?1", [queue], |_| Ok(()))
                .optional()?;
            if declared.is_none() {
                return Err(Error::not_found(format!("queue {queue} is not declared")));
            }

            conn.execute(
                "INSERT INTO queue_messages (queue, payload, enqueued_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![queue, payload, now()],
            )?;
            debug!("Published {} bytes to {}", payload.len(), queue);
            Ok(())
        })
    }

    fn receive(&self, queue: &str, mode: AckMode) -> Result<Option<Delivery>> {
        let lease_ms = self.lease.as_millis() as i64;

        self.db.with_tx(|conn| {
            let now_ms = now_millis();
            let next = conn
                .query_row(
                    "SELECT id, payload FROM queue_messages
                     WHERE queue = ?1 AND (leased_until IS NULL OR leased_until < ?2)
                     ORDER BY id
                     LIMIT 1",
                    rusqlite::params![queue, now_ms],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
                )
                .optional()?;

            let Some((id, payload)) = next else {
                return Ok(None);
            };

            match mode {
                AckMode::Auto => {
                    conn.execute("DELETE FROM queue_messages WHERE id = ?1", [id])?;
                }
                AckMode::Manual => {
                    conn.execute(
                        "UPDATE queue_messages SET leased_until = ?1 WHERE id = ?2",
                        [now_ms + lease_ms, id],
                    )?;
                }
            }

            Ok(Some(Delivery {
                id,
                queue: queue.to_string(),
                payload,
            }))
        })
    }

    fn ack(&self, delivery: &Delivery) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM queue_messages WHERE id = ?1", [delivery.id])?;
            Ok(())
        })
    }
}
