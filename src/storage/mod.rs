//! Storage backend abstraction
//!
//! The orchestrator writes fetched bytes through a [`StorageBackend`], a
//! root-rooted hierarchical store. The concrete backend (local disk, object
//! store, ...) is pluggable; the orchestrator depends only on this trait.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::Result;

mod local;

pub use local::LocalBackend;

/// Writable sink returned by [`StorageBackend::open_write`]
pub type WriteSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Root-rooted hierarchical store
///
/// All paths are relative to the backend's configured root; implementations
/// normalize separators when joining. Concurrent writers target disjoint
/// destination paths by construction, so the trait requires no locking
/// beyond what the backend itself guarantees for directory creation.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Open a writable sink at `path`, truncating any existing file
    async fn open_write(&self, path: &str) -> Result<WriteSink>;

    /// List the entry names directly under `path`
    async fn list(&self, path: &str) -> Result<Vec<String>>;

    /// Whether anything exists at `path`
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Whether `path` exists and is a directory
    async fn is_dir(&self, path: &str) -> Result<bool>;

    /// Create `path` and any missing parents
    ///
    /// With `exist_ok` false, an already-existing directory is an error.
    async fn make_dirs(&self, path: &str, exist_ok: bool) -> Result<()>;
}
