//! Durable offline submission queue backed by redb
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `pending_submissions` | sequence (u64) | `QueuedSubmission` | FIFO queue |
//! | `queue_meta` | `"next_seq"` | `u64` | Monotonic sequence counter |
//!
//! FIFO order is key order: redb iterates u64 keys ascending and the
//! sequence counter never reuses a value, so the first row is always the
//! oldest entry.
//!
//! # Durability
//!
//! redb commits are durable once `commit()` returns (copy-on-write with an
//! atomic root swap), so a terminal that loses power between enqueue and
//! drain still has the order on next start.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use shared::models::Order;
use shared::util::now_millis;

/// Table for queued submissions: key = sequence, value = JSON-serialized QueuedSubmission
const PENDING_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("pending_submissions");

/// Table for queue metadata: key = "next_seq", value = u64
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("queue_meta");

const NEXT_SEQ_KEY: &str = "next_seq";

/// One queued order waiting for server acknowledgment
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueuedSubmission {
    /// Queue position; assigned at enqueue, never reused
    pub seq: u64,
    pub order: Order,
    /// When the entry entered the queue (epoch ms)
    pub enqueued_at: i64,
    /// Failed drain attempts so far
    pub attempts: u32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<i64>,
}

/// Queue storage errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// Durable FIFO queue of not-yet-acknowledged orders
#[derive(Clone)]
pub struct SubmissionQueue {
    db: Arc<Database>,
}

impl SubmissionQueue {
    /// Open or create the queue database at the given path
    pub fn open(path: impl AsRef<Path>) -> QueueResult<Self> {
        let db = Database::create(path)?;
        Self::initialize(db)
    }

    /// Open an in-memory queue (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> QueueResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::initialize(db)
    }

    fn initialize(db: Database) -> QueueResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PENDING_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;
            if meta.get(NEXT_SEQ_KEY)?.is_none() {
                meta.insert(NEXT_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Append an order to the back of the queue; returns its sequence
    pub fn enqueue(&self, order: &Order) -> QueueResult<u64> {
        let txn = self.db.begin_write()?;
        let seq = {
            let mut meta = txn.open_table(META_TABLE)?;
            let seq = meta.get(NEXT_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0);
            meta.insert(NEXT_SEQ_KEY, seq + 1)?;

            let entry = QueuedSubmission {
                seq,
                order: order.clone(),
                enqueued_at: now_millis(),
                attempts: 0,
                last_error: None,
                last_attempt_at: None,
            };
            let value = serde_json::to_vec(&entry)?;
            let mut pending = txn.open_table(PENDING_TABLE)?;
            pending.insert(seq, value.as_slice())?;
            seq
        };
        txn.commit()?;
        Ok(seq)
    }

    /// Oldest entry, or None when the queue is empty
    pub fn front(&self) -> QueueResult<Option<QueuedSubmission>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;

        match table.iter()?.next() {
            Some(result) => {
                let (_key, value) = result?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }

    /// Remove an acknowledged entry
    pub fn remove(&self, seq: u64) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_TABLE)?;
            table.remove(seq)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Record a failed attempt: bump the counter and note the error, the
    /// entry stays queued for the next drain
    pub fn record_failure(&self, seq: u64, error: &str) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_TABLE)?;

            // Read and clone first to avoid holding the guard across insert
            let entry_opt = match table.get(seq)? {
                Some(value) => Some(serde_json::from_slice::<QueuedSubmission>(value.value())?),
                None => None,
            };

            if let Some(mut entry) = entry_opt {
                entry.attempts += 1;
                entry.last_error = Some(error.to_string());
                entry.last_attempt_at = Some(now_millis());
                let value = serde_json::to_vec(&entry)?;
                table.insert(seq, value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Number of queued entries
    pub fn len(&self) -> QueueResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All queued entries in FIFO order
    pub fn list(&self) -> QueueResult<Vec<QueuedSubmission>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }
}
