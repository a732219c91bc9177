//! Item record CRUD and state transitions.
//!
//! Every transition query carries a state guard in its WHERE clause, so the
//! `Queued -> InProgress -> {Complete, Error}` lifecycle is one-directional
//! even if two workers race on the same item id.

use crate::error::DatabaseError;
use crate::types::{BatchId, DownloadItem, ItemId, ItemState};
use crate::{Error, Result};

use super::{ItemRow, JobStore, NewItem};

/// Initial message persisted with every queued record
pub(crate) const QUEUED_MESSAGE: &str = "Queued";

/// Message persisted when a worker picks an item up
pub(crate) const IN_PROGRESS_MESSAGE: &str = "Downloading...";

impl JobStore {
    /// Insert a new item record in the `Queued` state
    pub async fn insert_item(&self, item: &NewItem) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO download_items (
                item_id, batch_id, container, path, state,
                started_at, completed_at, message, created_at
            ) VALUES (?, ?, ?, ?, ?, NULL, NULL, ?, ?)
            "#,
        )
        .bind(&item.item_id)
        .bind(&item.batch_id)
        .bind(&item.container)
        .bind(&item.path)
        .bind(ItemState::Queued.to_i32())
        .bind(QUEUED_MESSAGE)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert item: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get an item by ID
    pub async fn get_item(&self, item_id: &ItemId) -> Result<Option<DownloadItem>> {
        let _guard = self.write_lock.lock().await;

        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT
                item_id, batch_id, container, path, state,
                started_at, completed_at, message, created_at
            FROM download_items
            WHERE item_id = ?
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get item: {}",
                e
            )))
        })?;

        Ok(row.map(DownloadItem::from))
    }

    /// List all items belonging to a batch, in creation order
    pub async fn items_for_batch(&self, batch_id: &BatchId) -> Result<Vec<DownloadItem>> {
        let _guard = self.write_lock.lock().await;

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT
                item_id, batch_id, container, path, state,
                started_at, completed_at, message, created_at
            FROM download_items
            WHERE batch_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list batch items: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(DownloadItem::from).collect())
    }

    /// List all items with a specific state
    pub async fn items_by_state(&self, state: ItemState) -> Result<Vec<DownloadItem>> {
        let _guard = self.write_lock.lock().await;

        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT
                item_id, batch_id, container, path, state,
                started_at, completed_at, message, created_at
            FROM download_items
            WHERE state = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(state.to_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list items by state: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(DownloadItem::from).collect())
    }

    /// Total number of item records in the store
    pub async fn count_items(&self) -> Result<i64> {
        let _guard = self.write_lock.lock().await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM download_items")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count items: {}",
                    e
                )))
            })?;

        Ok(count)
    }

    /// Mark an item `InProgress` and stamp `started_at`
    ///
    /// Only applies to a `Queued` item; any other state is left untouched.
    pub async fn set_in_progress(&self, item_id: &ItemId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE download_items
            SET state = ?, started_at = ?, message = ?
            WHERE item_id = ? AND state = ?
            "#,
        )
        .bind(ItemState::InProgress.to_i32())
        .bind(now)
        .bind(IN_PROGRESS_MESSAGE)
        .bind(item_id)
        .bind(ItemState::Queued.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark item in progress: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Mark an item `Complete` with a result message and stamp `completed_at`
    ///
    /// Only applies to a non-terminal item; terminal records are never rewritten.
    pub async fn set_complete(&self, item_id: &ItemId, message: &str) -> Result<()> {
        self.set_terminal(item_id, ItemState::Complete, message)
            .await
    }

    /// Mark an item `Error` with a diagnostic message and stamp `completed_at`
    ///
    /// Only applies to a non-terminal item; terminal records are never rewritten.
    pub async fn set_error(&self, item_id: &ItemId, message: &str) -> Result<()> {
        self.set_terminal(item_id, ItemState::Error, message).await
    }

    async fn set_terminal(&self, item_id: &ItemId, state: ItemState, message: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE download_items
            SET state = ?, completed_at = ?, message = ?
            WHERE item_id = ? AND state IN (?, ?)
            "#,
        )
        .bind(state.to_i32())
        .bind(now)
        .bind(message)
        .bind(item_id)
        .bind(ItemState::Queued.to_i32())
        .bind(ItemState::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark item terminal: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Remove terminal records whose `completed_at` is older than the window
    ///
    /// Returns the number of records removed. `Queued` and `InProgress`
    /// records are never touched, regardless of age.
    pub async fn remove_expired(&self, retention_secs: u64) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let cutoff = chrono::Utc::now().timestamp() - retention_secs as i64;

        let result = sqlx::query(
            r#"
            DELETE FROM download_items
            WHERE state IN (?, ?) AND completed_at < ?
            "#,
        )
        .bind(ItemState::Complete.to_i32())
        .bind(ItemState::Error.to_i32())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to remove expired items: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}
