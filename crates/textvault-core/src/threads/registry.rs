//! Thread registry collaborator contract.

use thiserror::Error;

/// Errors reported by a thread registry.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// The platform capability backing the registry is missing. The resolver
    /// treats this as permanent for the remainder of the run.
    #[error("thread registry unavailable: {0}")]
    Unavailable(String),

    /// A lookup or creation attempt failed.
    #[error("thread lookup failed: {0}")]
    Lookup(String),

    /// Recomputing thread metadata failed.
    #[error("thread rebuild failed: {0}")]
    Rebuild(String),
}

/// Capability that maps a recipient address to a local conversation-thread
/// id, creating the thread if necessary.
pub trait ThreadRegistry {
    /// Returns the thread id for an address, creating a thread if none exists.
    async fn get_or_create_thread(&self, address: &str) -> Result<i64, ThreadError>;

    /// Forces a full recomputation of conversation-thread metadata. Run after
    /// a restore, since bulk insertion leaves per-thread dates and counts stale.
    async fn rebuild(&self) -> Result<(), ThreadError>;
}
