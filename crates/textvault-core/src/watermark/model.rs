//! Watermark model and store contract.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::record::RecordKind;

/// Sentinel watermark written before any record has ever been synchronized.
///
/// Every real record timestamp compares greater than this, so a sync with an
/// epoch watermark considers all records new.
pub const EPOCH: i64 = -1;

/// Direction of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncDirection {
    /// Local records to the remote folder.
    Backup,
    /// Remote messages back into the local store.
    Restore,
}

impl SyncDirection {
    /// Storage string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }

    /// Parse from the storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "backup" => Some(Self::Backup),
            "restore" => Some(Self::Restore),
            _ => None,
        }
    }
}

/// Persistent store of one monotonically non-decreasing timestamp per
/// (record kind × direction).
pub trait WatermarkStore {
    /// Returns the watermark, or `None` if that kind/direction has never
    /// been synchronized.
    async fn get(&self, kind: RecordKind, direction: SyncDirection) -> Result<Option<i64>>;

    /// Advances the watermark. Implementations never let a watermark
    /// decrease; setting a smaller value is a no-op.
    async fn set(&self, kind: RecordKind, direction: SyncDirection, timestamp: i64) -> Result<()>;

    /// Whether no backup watermark has ever been written.
    async fn is_first_sync(&self) -> Result<bool>;
}
