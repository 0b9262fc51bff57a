//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur during synchronization.
///
/// The first three variants form the failure taxonomy surfaced to users:
/// authentication and connectivity problems terminate a run in their own
/// distinct states so the caller can react differently (re-prompt for
/// credentials vs. retry later), everything else collapses into a general
/// messaging failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote store rejected the configured credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Remote store is temporarily unreachable.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Remote protocol or I/O failure, or local resource exhaustion.
    #[error("messaging error: {0}")]
    Messaging(String),

    /// Login information has not been configured yet.
    #[error("login information required")]
    MissingCredentials,

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
