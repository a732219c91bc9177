//! Shared helpers for downloader tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::{Config, PersistenceConfig, RetentionConfig, StorageConfig, WorkerConfig};
use crate::error::{Error, Result};
use crate::fetcher::{FetchArgs, ResourceFetcher};
use crate::types::FetchOutcome;

use super::MediaDownloader;

/// Build a config pointing at scratch paths inside `temp`
pub(crate) fn test_config(temp: &tempfile::TempDir) -> Config {
    Config {
        storage: StorageConfig {
            root: temp.path().join("media"),
            ..Default::default()
        },
        persistence: PersistenceConfig {
            database_path: temp.path().join("test.db"),
        },
        ..Default::default()
    }
}

/// Create a downloader backed by a temporary directory
pub(crate) async fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let downloader = MediaDownloader::new(test_config(&temp)).await.unwrap();
    (downloader, temp)
}

/// Create a downloader with explicit worker settings
pub(crate) async fn create_test_downloader_with_worker(
    max_concurrent: usize,
    low_water: Option<usize>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let config = Config {
        worker: WorkerConfig {
            max_concurrent,
            low_water,
        },
        ..test_config(&temp)
    };
    let downloader = MediaDownloader::new(config).await.unwrap();
    (downloader, temp)
}

/// Create a downloader whose retention window is already expired
pub(crate) async fn create_test_downloader_with_retention(
    retention_secs: u64,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let config = Config {
        retention: RetentionConfig {
            retention_secs,
            sweep_interval_secs: 1,
        },
        ..test_config(&temp)
    };
    let downloader = MediaDownloader::new(config).await.unwrap();
    (downloader, temp)
}

/// Fetcher returning a fixed outcome after writing a fixed body
pub(crate) struct StaticFetcher {
    pub(crate) body: Vec<u8>,
    pub(crate) outcome: FetchOutcome,
    pub(crate) prefix: String,
}

impl StaticFetcher {
    pub(crate) fn success(body: &[u8]) -> Arc<dyn ResourceFetcher> {
        Arc::new(Self {
            body: body.to_vec(),
            outcome: FetchOutcome::Success {
                total_size: body.len() as u64,
            },
            prefix: String::new(),
        })
    }

    pub(crate) fn failure(code: u16, server_message: &str) -> Arc<dyn ResourceFetcher> {
        Arc::new(Self {
            body: Vec::new(),
            outcome: FetchOutcome::Failure {
                code,
                server_message: server_message.to_string(),
            },
            prefix: String::new(),
        })
    }

    pub(crate) fn with_prefix(body: &[u8], prefix: &str) -> Arc<dyn ResourceFetcher> {
        Arc::new(Self {
            body: body.to_vec(),
            outcome: FetchOutcome::Success {
                total_size: body.len() as u64,
            },
            prefix: prefix.to_string(),
        })
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        _extra: &FetchArgs,
    ) -> Result<FetchOutcome> {
        if self.outcome.is_success() {
            sink.write_all(&self.body).await?;
        }
        Ok(self.outcome.clone())
    }

    fn path_prefix(&self) -> String {
        self.prefix.clone()
    }
}

/// Fetcher that records its own concurrency while sleeping
pub(crate) struct CountingFetcher {
    pub(crate) current: Arc<AtomicUsize>,
    pub(crate) peak: Arc<AtomicUsize>,
    pub(crate) hold: Duration,
}

impl CountingFetcher {
    pub(crate) fn new(hold: Duration) -> (Arc<Self>, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let fetcher = Arc::new(Self {
            current: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
            hold,
        });
        (fetcher, peak)
    }
}

#[async_trait]
impl ResourceFetcher for CountingFetcher {
    async fn fetch(
        &self,
        _sink: &mut (dyn AsyncWrite + Send + Unpin),
        _extra: &FetchArgs,
    ) -> Result<FetchOutcome> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;

        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(FetchOutcome::Success { total_size: 0 })
    }
}

/// Fetcher that blocks until its gate is opened
pub(crate) struct GatedFetcher {
    gate: Arc<tokio::sync::Semaphore>,
}

impl GatedFetcher {
    /// Create a fetcher and its gate, initially closed
    pub(crate) fn new() -> (Arc<Self>, Arc<tokio::sync::Semaphore>) {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let fetcher = Arc::new(Self {
            gate: Arc::clone(&gate),
        });
        (fetcher, gate)
    }
}

#[async_trait]
impl ResourceFetcher for GatedFetcher {
    async fn fetch(
        &self,
        _sink: &mut (dyn AsyncWrite + Send + Unpin),
        _extra: &FetchArgs,
    ) -> Result<FetchOutcome> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::Other(format!("gate closed: {}", e)))?;
        permit.forget();
        Ok(FetchOutcome::Success { total_size: 0 })
    }
}

/// Fetcher that panics mid-fetch
pub(crate) struct PanickingFetcher;

#[async_trait]
impl ResourceFetcher for PanickingFetcher {
    async fn fetch(
        &self,
        _sink: &mut (dyn AsyncWrite + Send + Unpin),
        _extra: &FetchArgs,
    ) -> Result<FetchOutcome> {
        panic!("simulated fetcher panic");
    }
}

/// Fetcher that fails with a local error instead of a remote refusal
pub(crate) struct ErroringFetcher;

#[async_trait]
impl ResourceFetcher for ErroringFetcher {
    async fn fetch(
        &self,
        _sink: &mut (dyn AsyncWrite + Send + Unpin),
        _extra: &FetchArgs,
    ) -> Result<FetchOutcome> {
        Err(Error::Other("connection reset by peer".into()))
    }
}

/// Poll the store until every item of the batch is terminal, or time out
pub(crate) async fn wait_for_batch(
    downloader: &MediaDownloader,
    batch_id: &crate::types::BatchId,
    expected: usize,
) -> Vec<crate::types::DownloadItem> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let items = downloader.batch_status(batch_id).await.unwrap();
        if items.len() == expected && items.iter().all(|i| i.state.is_terminal()) {
            return items;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "batch did not reach a terminal state in time: {items:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
