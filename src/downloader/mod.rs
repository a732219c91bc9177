//! Core orchestrator implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`batch`] - Batch creation, validation, and status queries
//! - [`worker`] - Bounded-concurrency item dispatch and execution
//! - [`retention`] - Terminal-record retention sweeping

mod batch;
mod retention;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{Config, StorageKind};
use crate::db::JobStore;
use crate::error::{Error, Result};
use crate::storage::{LocalBackend, StorageBackend};
use crate::types::Event;

pub(crate) use worker::WorkerSlots;

/// Worker dispatch state
#[derive(Clone)]
pub(crate) struct WorkerState {
    /// Bounded admission for concurrent item fetches
    pub(crate) slots: Arc<WorkerSlots>,
    /// Flag to indicate whether new downloads are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
///
/// Created from a [`Config`]; callers hand it fetch capabilities via
/// [`download`](MediaDownloader::download) and poll item state via
/// [`batch_status`](MediaDownloader::batch_status), or subscribe to the
/// event bus instead of polling.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Job-state store for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests and status endpoints to query item state
    pub store: Arc<JobStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Storage backend all destination paths resolve against
    pub(crate) storage: Arc<dyn StorageBackend>,
    /// Worker dispatch state
    pub(crate) worker_state: WorkerState,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Ensures the storage root exists
    /// - Opens/creates the SQLite job store and runs migrations
    /// - Sets up the event broadcast channel and worker slots
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        // Ensure the storage root exists
        tokio::fs::create_dir_all(&config.storage.root)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage root '{}': {}",
                        config.storage.root.display(),
                        e
                    ),
                ))
            })?;

        let storage: Arc<dyn StorageBackend> = match config.storage.backend {
            StorageKind::Local => Arc::new(LocalBackend::new(&config.storage.root)),
        };

        // Initialize the job store
        let store = JobStore::new(&config.persistence.database_path).await?;

        // Create broadcast channel with buffer size of 1000 events
        // This allows multiple subscribers to receive all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let worker_state = WorkerState {
            slots: WorkerSlots::new(
                config.worker.max_concurrent,
                config.worker.effective_low_water(),
            ),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        Ok(Self {
            store: Arc::new(store),
            event_tx,
            config: Arc::new(config),
            storage,
            worker_state,
        })
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently. Events are buffered, but if a subscriber falls behind by
    /// more than 1000 events, it will receive a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    ///
    /// The configuration is wrapped in an Arc, so this is a cheap clone.
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Initiate graceful shutdown
    ///
    /// New `download()` calls fail with [`Error::ShuttingDown`] and the
    /// retention sweeper exits at its next tick. Items already dispatched run
    /// to completion; there is no in-flight cancellation.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutdown initiated, no longer accepting downloads");
        self.worker_state
            .accepting_new
            .store(false, Ordering::SeqCst);
        self.emit_event(Event::Shutdown);
        Ok(())
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped
    /// (ok() converts Err to None). This allows the download process to
    /// continue even if no one is listening to events.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
