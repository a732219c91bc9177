//! Resource fetch capabilities
//!
//! A [`ResourceFetcher`] is an opaque capability supplied by the caller per
//! item: the orchestrator opens a write sink at the destination path and
//! hands it over, without knowing how the resource was discovered. The crate
//! ships [`HttpFetcher`] for plain HTTP resources; other sources implement
//! the trait.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::types::FetchOutcome;

/// Extra per-item arguments forwarded to [`ResourceFetcher::fetch`]
///
/// Positional values plus a keyword map, both JSON-typed so callers can pass
/// through whatever their fetcher implementation understands.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FetchArgs {
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<serde_json::Value>,

    /// Keyword arguments
    #[serde(default)]
    pub kwargs: serde_json::Map<String, serde_json::Value>,
}

/// A fetchable remote resource
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Stream the resource into `sink`
    ///
    /// Returns `Ok(FetchOutcome::Failure { .. })` for remote-side refusals
    /// (e.g., a non-2xx response); `Err` is reserved for local faults
    /// (network stack, sink write), which the worker records as an `Error`
    /// item state.
    async fn fetch(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        extra: &FetchArgs,
    ) -> Result<FetchOutcome>;

    /// Prefix prepended to the destination name inside the container
    ///
    /// Used to encode ordering metadata in filenames (e.g., `"S2E5 - "`).
    fn path_prefix(&self) -> String {
        String::new()
    }
}

/// Build a season/episode ordering prefix (`"S2E5 - "`)
pub fn episode_path_prefix(season: u32, episode: u32) -> String {
    format!("S{season}E{episode} - ")
}

/// HTTP resource fetcher
///
/// Streams the response body into the sink chunk by chunk, accumulating the
/// total byte count. A non-success status is reported as a
/// [`FetchOutcome::Failure`] carrying the status code and response body.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
    prefix: String,
}

impl HttpFetcher {
    /// Create a fetcher for `url` with a default client
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Create a fetcher for `url` reusing an existing client
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            prefix: String::new(),
        }
    }

    /// Set the destination-name prefix (see [`ResourceFetcher::path_prefix`])
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        _extra: &FetchArgs,
    ) -> Result<FetchOutcome> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(FetchOutcome::Failure {
                code: status.as_u16(),
                server_message: body,
            });
        }

        let mut total_size: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            total_size += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(FetchOutcome::Success { total_size })
    }

    fn path_prefix(&self) -> String {
        self.prefix.clone()
    }
}
