//! Bounded-concurrency item dispatch and execution.
//!
//! Admission is slot-based rather than semaphore-based: once all slots are
//! taken, waiting items stay blocked until the active count drains below the
//! low-water mark, then the pool refills back up to the maximum. Each item
//! runs inside a panic boundary so one misbehaving fetcher cannot take down
//! a batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;

use crate::error::Result;
use crate::fetcher::{FetchArgs, ResourceFetcher};
use crate::types::{Event, FetchOutcome, ItemId};

use super::MediaDownloader;

/// One item of work handed to the dispatch loop
pub(crate) struct WorkItem {
    /// Persisted record this work corresponds to
    pub(crate) item_id: ItemId,
    /// Capability that streams the resource
    pub(crate) fetcher: Arc<dyn ResourceFetcher>,
    /// Destination file name inside the container
    pub(crate) name: String,
    /// Extra arguments forwarded to the fetcher
    pub(crate) extra: FetchArgs,
}

/// Slot pool bounding concurrent item fetches
///
/// At most `max` items run at once. When the pool saturates it switches into
/// a draining phase: no new item is admitted until the active count falls
/// below `low_water`, after which the pool refills to `max` again. With
/// `low_water == max` this degenerates to a plain counting semaphore.
pub(crate) struct WorkerSlots {
    max: usize,
    low_water: usize,
    active: AtomicUsize,
    draining: AtomicBool,
    released: Notify,
}

impl WorkerSlots {
    pub(crate) fn new(max: usize, low_water: usize) -> Arc<Self> {
        Arc::new(Self {
            max,
            low_water,
            active: AtomicUsize::new(0),
            draining: AtomicBool::new(false),
            released: Notify::new(),
        })
    }

    /// Number of items currently holding a slot
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Wait for a slot, then claim it
    pub(crate) async fn acquire(self: Arc<Self>) -> SlotGuard {
        self.wait_for_slot().await;
        SlotGuard { slots: self }
    }

    async fn wait_for_slot(&self) {
        loop {
            // Register for release notifications before checking the count,
            // otherwise a release between the check and the await is lost
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire() {
                return;
            }

            notified.await;
        }
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            let threshold = if self.draining.load(Ordering::Acquire) {
                self.low_water
            } else {
                self.max
            };

            if current >= threshold {
                if current >= self.max {
                    self.draining.store(true, Ordering::Release);
                }
                return false;
            }

            match self.active.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // The pool drained below the low-water mark; refill to max
                    self.draining.store(false, Ordering::Release);
                    return true;
                }
                Err(observed) => current = observed,
            }
        }
    }

    fn release(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        self.released.notify_waiters();
    }
}

/// RAII claim on one worker slot; released on drop
pub(crate) struct SlotGuard {
    slots: Arc<WorkerSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.release();
    }
}

impl MediaDownloader {
    /// Dispatch all items of a batch through the slot pool
    ///
    /// Items are admitted in order but complete in whatever order their
    /// fetches finish. Returns once every item has reached a terminal state.
    pub(crate) async fn run_batch(self, container: String, items: Vec<WorkItem>) {
        let mut handles = Vec::with_capacity(items.len());

        for work in items {
            let guard = Arc::clone(&self.worker_state.slots).acquire().await;
            let downloader = self.clone();
            let container = container.clone();

            handles.push(tokio::spawn(async move {
                downloader.run_item(guard, &container, work).await;
            }));
        }

        for handle in handles {
            // Item panics are caught inside run_item; a join error here means
            // the task was cancelled at runtime shutdown
            handle.await.ok();
        }
    }

    /// Run one item to a terminal state, holding its slot for the duration
    async fn run_item(&self, guard: SlotGuard, container: &str, work: WorkItem) {
        let _guard = guard;
        let item_id = work.item_id.clone();

        if let Err(e) = self.store.set_in_progress(&item_id).await {
            tracing::error!(item_id = %item_id, error = %e, "Failed to mark item in progress");
        }
        self.emit_event(Event::ItemStarted {
            item_id: item_id.clone(),
        });
        tracing::info!(item_id = %item_id, name = %work.name, "Starting download");

        let result = std::panic::AssertUnwindSafe(self.fetch_into_storage(container, &work))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) if outcome.is_success() => {
                let message = outcome.message();
                if let Err(e) = self.store.set_complete(&item_id, &message).await {
                    tracing::error!(item_id = %item_id, error = %e, "Failed to mark item complete");
                }
                tracing::info!(item_id = %item_id, "Download complete");
                self.emit_event(Event::ItemComplete { item_id, message });
            }
            Ok(Ok(outcome)) => {
                let message = outcome.message();
                if let Err(e) = self.store.set_error(&item_id, &message).await {
                    tracing::error!(item_id = %item_id, error = %e, "Failed to mark item failed");
                }
                tracing::warn!(item_id = %item_id, message = %message, "Download refused by remote");
                self.emit_event(Event::ItemFailed { item_id, message });
            }
            Ok(Err(e)) => {
                let message = format!("Download failed: {}", e);
                if let Err(e) = self.store.set_error(&item_id, &message).await {
                    tracing::error!(item_id = %item_id, error = %e, "Failed to mark item failed");
                }
                tracing::warn!(item_id = %item_id, message = %message, "Download failed");
                self.emit_event(Event::ItemFailed { item_id, message });
            }
            Err(_panic) => {
                let message = "Download worker panicked".to_string();
                if let Err(e) = self.store.set_error(&item_id, &message).await {
                    tracing::error!(item_id = %item_id, error = %e, "Failed to mark item failed");
                }
                tracing::error!(item_id = %item_id, "Download worker panicked");
                self.emit_event(Event::ItemFailed { item_id, message });
            }
        }
    }

    /// Open the destination sink and stream the resource into it
    ///
    /// The on-disk name carries the fetcher's path prefix; the persisted
    /// record path does not.
    async fn fetch_into_storage(&self, container: &str, work: &WorkItem) -> Result<FetchOutcome> {
        let destination = format!("{}/{}{}", container, work.fetcher.path_prefix(), work.name);
        let mut sink = self.storage.open_write(&destination).await?;
        let outcome = work.fetcher.fetch(sink.as_mut(), &work.extra).await?;
        sink.shutdown().await?;
        Ok(outcome)
    }
}
