//! Job-state persistence for media-dl
//!
//! Handles SQLite persistence for download item records. The underlying
//! store follows a single-writer discipline: every operation, reads
//! included, serializes through one exclusive lock so concurrent workers
//! never produce torn reads of composite records.
//!
//! ## Submodules
//!
//! Methods on [`JobStore`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`items`] — Item record CRUD and state transitions

use sqlx::{FromRow, sqlite::SqlitePool};

use crate::types::{BatchId, DownloadItem, ItemId, ItemState};

mod items;
mod migrations;

/// New item record to be inserted into the store
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Unique item identifier
    pub item_id: ItemId,
    /// Batch this item belongs to
    pub batch_id: BatchId,
    /// Destination directory relative to the storage root
    pub container: String,
    /// Full destination path (`container/name`)
    pub path: String,
}

/// Item record as stored in SQLite (state as integer code)
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    /// Unique item identifier
    pub item_id: String,
    /// Batch this item belongs to
    pub batch_id: String,
    /// Destination directory relative to the storage root
    pub container: String,
    /// Full destination path
    pub path: String,
    /// State code (0=queued, 1=in_progress, 2=complete, 3=error)
    pub state: i32,
    /// Unix timestamp when the fetch started
    pub started_at: Option<i64>,
    /// Unix timestamp when the fetch reached a terminal state
    pub completed_at: Option<i64>,
    /// Human-readable status/result/diagnostic
    pub message: String,
    /// Unix timestamp when the record was created
    pub created_at: i64,
}

impl From<ItemRow> for DownloadItem {
    fn from(row: ItemRow) -> Self {
        DownloadItem {
            item_id: ItemId(row.item_id),
            batch_id: BatchId(row.batch_id),
            container: row.container,
            path: row.path,
            state: ItemState::from_i32(row.state),
            started_at: row.started_at,
            completed_at: row.completed_at,
            message: row.message,
        }
    }
}

/// Persisted job-state store for media-dl
///
/// Mutated by many concurrent workers and read by status-query callers; all
/// access goes through [`JobStore::write_lock`].
pub struct JobStore {
    pool: SqlitePool,
    /// Exclusive lock enforcing the single-writer-at-a-time discipline
    write_lock: tokio::sync::Mutex<()>,
}
