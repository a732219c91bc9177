//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Storage backend configuration (root path, backend selection)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root path all destination containers resolve under (default: "./media")
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// Which backend implementation to use
    #[serde(default)]
    pub backend: StorageKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            backend: StorageKind::default(),
        }
    }
}

/// Selectable storage backend implementations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Local filesystem under the configured root
    #[default]
    Local,
}

/// Worker pool configuration (concurrency ceiling and low-water mark)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum number of items fetched concurrently (default: 16)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Active-count threshold below which blocked submissions resume after
    /// hitting the ceiling (default: same as `max_concurrent`)
    #[serde(default)]
    pub low_water: Option<usize>,
}

impl WorkerConfig {
    /// Effective low-water mark: the configured value, or the ceiling itself
    pub fn effective_low_water(&self) -> usize {
        self.low_water.unwrap_or(self.max_concurrent)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            low_water: None,
        }
    }
}

/// Retention sweeping configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Minimum age a terminal record must reach before it is eligible for
    /// removal (default: 1 hour)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// How often the sweeper runs (default: 300 seconds)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl RetentionConfig {
    /// Retention window as a [`Duration`]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Sweep period as a [`Duration`]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Persistence configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path to the SQLite job-state database (default: "./media-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Top-level configuration for [`MediaDownloader`](crate::MediaDownloader)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker pool settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Retention sweeping settings
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Persistence settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Validate configuration invariants
    ///
    /// Rejects a zero concurrency ceiling and a low-water mark above the
    /// ceiling; both would deadlock submission.
    pub fn validate(&self) -> Result<()> {
        if self.worker.max_concurrent == 0 {
            return Err(Error::Config {
                message: "max_concurrent must be at least 1".into(),
                key: Some("worker.max_concurrent".into()),
            });
        }

        if let Some(low_water) = self.worker.low_water {
            if low_water == 0 {
                return Err(Error::Config {
                    message: "low_water must be at least 1".into(),
                    key: Some("worker.low_water".into()),
                });
            }
            if low_water > self.worker.max_concurrent {
                return Err(Error::Config {
                    message: format!(
                        "low_water ({}) must not exceed max_concurrent ({})",
                        low_water, self.worker.max_concurrent
                    ),
                    key: Some("worker.low_water".into()),
                });
            }
        }

        Ok(())
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./media")
}

fn default_max_concurrent() -> usize {
    16
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./media-dl.db")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.worker.max_concurrent, 16);
        assert_eq!(config.worker.effective_low_water(), 16);
        assert_eq!(config.retention.sweep_interval_secs, 300);
    }

    #[test]
    fn explicit_low_water_is_used_when_set() {
        let config = Config {
            worker: WorkerConfig {
                max_concurrent: 16,
                low_water: Some(12),
            },
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.worker.effective_low_water(), 12);
    }

    #[test]
    fn zero_max_concurrent_is_rejected() {
        let config = Config {
            worker: WorkerConfig {
                max_concurrent: 0,
                low_water: None,
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("worker.max_concurrent"));
            }
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn low_water_above_ceiling_is_rejected() {
        let config = Config {
            worker: WorkerConfig {
                max_concurrent: 4,
                low_water: Some(8),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_low_water_is_rejected() {
        let config = Config {
            worker: WorkerConfig {
                max_concurrent: 4,
                low_water: Some(0),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.storage.root, PathBuf::from("./media"));
        assert_eq!(config.storage.backend, StorageKind::Local);
        assert_eq!(config.retention.retention_secs, 3600);
        assert_eq!(
            config.persistence.database_path,
            PathBuf::from("./media-dl.db")
        );
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config: Config = serde_json::from_str(
            r#"{"worker": {"max_concurrent": 4}, "retention": {"retention_secs": 60}}"#,
        )
        .unwrap();
        assert_eq!(config.worker.max_concurrent, 4);
        assert_eq!(config.worker.low_water, None);
        assert_eq!(config.retention.retention_secs, 60);
        assert_eq!(config.retention.sweep_interval_secs, 300);
    }
}
