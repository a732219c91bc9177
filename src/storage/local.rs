//! Local-disk storage backend.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{StorageBackend, WriteSink};

/// Storage backend writing to the local filesystem under a root prefix
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join a relative path onto the root, normalizing leading separators
    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn open_write(&self, path: &str) -> Result<WriteSink> {
        let full = self.full_path(path);
        let file = tokio::fs::File::create(&full).await.map_err(|e| {
            Error::Storage(format!("failed to open '{}' for write: {}", full.display(), e))
        })?;
        Ok(Box::new(file))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        let full = self.full_path(path);
        let mut read_dir = tokio::fs::read_dir(&full).await.map_err(|e| {
            Error::Storage(format!("failed to list '{}': {}", full.display(), e))
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
            Error::Storage(format!("failed to read entry in '{}': {}", full.display(), e))
        })? {
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }
        entries.sort();

        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(path_metadata(&self.full_path(path)).await?.is_some())
    }

    async fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(path_metadata(&self.full_path(path))
            .await?
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn make_dirs(&self, path: &str, exist_ok: bool) -> Result<()> {
        let full = self.full_path(path);

        if !exist_ok && path_metadata(&full).await?.is_some() {
            return Err(Error::Storage(format!(
                "'{}' already exists",
                full.display()
            )));
        }

        tokio::fs::create_dir_all(&full).await.map_err(|e| {
            Error::Storage(format!(
                "failed to create directory '{}': {}",
                full.display(),
                e
            ))
        })
    }
}

/// Metadata lookup that maps "not found" to None instead of an error
async fn path_metadata(path: &Path) -> Result<Option<std::fs::Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Storage(format!(
            "failed to stat '{}': {}",
            path.display(),
            e
        ))),
    }
}
