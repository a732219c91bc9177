//! Core types for media-dl

use serde::{Deserialize, Serialize};

/// Unique identifier for one fetch item
///
/// Generated randomly rather than from a wall-clock hash so that rapid
/// concurrent `download()` calls cannot collide.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Generate a fresh random item id (16 hex characters)
    pub fn generate() -> Self {
        use rand::Rng;
        Self(format!("{:016x}", rand::thread_rng().r#gen::<u64>()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier shared by all items created in one `download()` call
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Generate a fresh random batch id (32 hex characters)
    pub fn generate() -> Self {
        use rand::Rng;
        Self(format!("{:032x}", rand::thread_rng().r#gen::<u128>()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// Implement sqlx Type, Encode, and Decode so ids bind directly in queries
macro_rules! impl_sqlite_text_id {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Sqlite> for $ty {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $ty {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

impl_sqlite_text_id!(ItemId);
impl_sqlite_text_id!(BatchId);

/// Lifecycle state of a download item
///
/// Transitions are monotonic and one-directional:
/// `Queued -> InProgress -> {Complete, Error}`. No transition ever leaves a
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Recorded, waiting for a worker slot
    Queued,
    /// A worker is fetching this item
    InProgress,
    /// Fetch finished successfully
    Complete,
    /// Fetch failed (storage, remote, or unexpected worker error)
    Error,
}

impl ItemState {
    /// Convert integer state code to ItemState enum
    pub fn from_i32(state: i32) -> Self {
        match state {
            0 => ItemState::Queued,
            1 => ItemState::InProgress,
            2 => ItemState::Complete,
            3 => ItemState::Error,
            _ => ItemState::Error, // Default to Error for unknown state
        }
    }

    /// Convert ItemState enum to integer state code
    pub fn to_i32(&self) -> i32 {
        match self {
            ItemState::Queued => 0,
            ItemState::InProgress => 1,
            ItemState::Complete => 2,
            ItemState::Error => 3,
        }
    }

    /// Whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemState::Complete | ItemState::Error)
    }
}

/// Persisted record for one resource-to-destination fetch
///
/// This is the durable contract a status endpoint built atop the orchestrator
/// exposes unchanged. Timestamps are Unix seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Unique item identifier
    pub item_id: ItemId,

    /// Batch this item was created in
    pub batch_id: BatchId,

    /// Destination directory, relative to the storage root
    pub container: String,

    /// Full destination path (`container/name`)
    pub path: String,

    /// Current lifecycle state
    pub state: ItemState,

    /// When the fetch started (None while queued)
    pub started_at: Option<i64>,

    /// When the fetch reached a terminal state (None until then)
    pub completed_at: Option<i64>,

    /// Human-readable status/result/diagnostic
    pub message: String,
}

/// Result of a resource fetch, as reported by the capability
///
/// The serialized JSON form of this value is what gets persisted as the
/// item's `message` on completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum FetchOutcome {
    /// The resource was streamed into the sink completely
    Success {
        /// Total number of bytes written
        total_size: u64,
    },
    /// The remote end refused or the transfer failed mid-stream
    Failure {
        /// Upstream status code (e.g., HTTP status)
        code: u16,
        /// Diagnostic body or message from the remote end
        server_message: String,
    },
}

impl FetchOutcome {
    /// Whether the fetch succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Serialized form used as the persisted item message
    pub fn message(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"result":"failure"}"#.to_string())
    }
}

/// Event emitted during the item lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Item recorded as queued
    ItemQueued {
        /// Item ID
        item_id: ItemId,
        /// Batch the item belongs to
        batch_id: BatchId,
        /// Destination path
        path: String,
    },

    /// A worker started fetching the item
    ItemStarted {
        /// Item ID
        item_id: ItemId,
    },

    /// Item fetch completed successfully
    ItemComplete {
        /// Item ID
        item_id: ItemId,
        /// Result message (serialized [`FetchOutcome`])
        message: String,
    },

    /// Item fetch failed
    ItemFailed {
        /// Item ID
        item_id: ItemId,
        /// Diagnostic message
        message: String,
    },

    /// Retention sweep removed terminal records
    RecordsSwept {
        /// Number of records removed
        removed: u64,
    },

    /// Graceful shutdown initiated
    Shutdown,
}
