//! Batch creation, validation, and status queries.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::db::NewItem;
use crate::error::{Error, Result};
use crate::fetcher::{FetchArgs, ResourceFetcher};
use crate::types::{BatchId, DownloadItem, Event, ItemId};

use super::MediaDownloader;
use super::worker::WorkItem;

impl MediaDownloader {
    /// Create a batch of downloads into `container`
    ///
    /// `resources`, `names`, and `extras` are parallel lists; `extras` may be
    /// `None` to default every item to empty arguments. A length mismatch
    /// fails with [`Error::ArgumentMismatch`] before anything is created or
    /// recorded.
    ///
    /// On success the container directory exists, one `Queued` record per
    /// item is persisted, and the records are returned immediately; the
    /// actual fetches run in the background under the worker concurrency
    /// limit. Track progress via [`subscribe`](MediaDownloader::subscribe) or
    /// by polling [`batch_status`](MediaDownloader::batch_status).
    pub async fn download(
        &self,
        container: &str,
        resources: Vec<Arc<dyn ResourceFetcher>>,
        names: Vec<String>,
        extras: Option<Vec<FetchArgs>>,
    ) -> Result<Vec<DownloadItem>> {
        if !self.worker_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let extras = extras.unwrap_or_else(|| vec![FetchArgs::default(); resources.len()]);

        // Validate before touching storage or the store: a mismatch must
        // leave no trace
        if resources.len() != names.len() || names.len() != extras.len() {
            return Err(Error::ArgumentMismatch {
                resources: resources.len(),
                names: names.len(),
                extras: extras.len(),
            });
        }

        self.storage.make_dirs(container, true).await?;

        let batch_id = BatchId::generate();
        tracing::info!(
            batch_id = %batch_id,
            container = %container,
            items = resources.len(),
            "Creating download batch"
        );

        let mut work = Vec::with_capacity(resources.len());
        for ((fetcher, name), extra) in resources.into_iter().zip(names).zip(extras) {
            let item_id = ItemId::generate();
            let path = format!("{}/{}", container, name);

            self.store
                .insert_item(&NewItem {
                    item_id: item_id.clone(),
                    batch_id: batch_id.clone(),
                    container: container.to_string(),
                    path: path.clone(),
                })
                .await?;

            self.emit_event(Event::ItemQueued {
                item_id: item_id.clone(),
                batch_id: batch_id.clone(),
                path,
            });

            work.push(WorkItem {
                item_id,
                fetcher,
                name,
                extra,
            });
        }

        let records = self.store.items_for_batch(&batch_id).await?;

        let downloader = self.clone();
        let container = container.to_string();
        tokio::spawn(async move {
            downloader.run_batch(container, work).await;
        });

        Ok(records)
    }

    /// Get the persisted record for one item
    pub async fn item_status(&self, item_id: &ItemId) -> Result<DownloadItem> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("item '{}'", item_id)))
    }

    /// Get the persisted records for every item in a batch, in creation order
    ///
    /// An unknown batch id yields an empty list rather than an error; a swept
    /// batch is indistinguishable from one that never existed.
    pub async fn batch_status(&self, batch_id: &BatchId) -> Result<Vec<DownloadItem>> {
        self.store.items_for_batch(batch_id).await
    }
}
