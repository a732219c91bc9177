//! Terminal-record retention sweeping.
//!
//! Completed and failed records are kept for a configurable window so status
//! consumers can observe the outcome, then removed. Records that have not
//! reached a terminal state are never swept, regardless of age.

use std::sync::atomic::Ordering;

use crate::error::Result;
use crate::types::Event;

use super::MediaDownloader;

impl MediaDownloader {
    /// Remove terminal records older than the configured retention window
    ///
    /// Returns the number of records removed. Safe to call at any time,
    /// including concurrently with active downloads.
    pub async fn sweep_expired_records(&self) -> Result<u64> {
        let removed = self
            .store
            .remove_expired(self.config.retention.retention_secs)
            .await?;

        if removed > 0 {
            tracing::info!(removed, "Swept expired download records");
            self.emit_event(Event::RecordsSwept { removed });
        }

        Ok(removed)
    }

    /// Start the periodic retention sweeper as a background task
    ///
    /// Runs [`sweep_expired_records`](Self::sweep_expired_records) every
    /// `retention.sweep_interval_secs` until shutdown.
    pub fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        let interval = downloader.config.retention.sweep_interval();

        tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Retention sweeper started"
            );

            loop {
                tokio::time::sleep(interval).await;

                if !downloader
                    .worker_state
                    .accepting_new
                    .load(Ordering::SeqCst)
                {
                    tracing::info!("Retention sweeper stopping due to shutdown");
                    break;
                }

                if let Err(e) = downloader.sweep_expired_records().await {
                    tracing::error!(error = %e, "Retention sweep failed");
                }
            }
        })
    }
}
