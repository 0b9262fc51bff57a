//! Collaborator traits for the remote mail-folder store.
//!
//! The engine never speaks a wire protocol itself; an implementation of
//! [`RemoteStore`] (an IMAP account, a test double, ...) is supplied by the
//! caller. Remote failures are reported in three distinct categories so that
//! runs can terminate in distinct user-visible states.

use thiserror::Error;

use crate::Error;
use crate::message::MessageArtifact;

/// Errors reported by the remote mail-folder store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credentials were rejected. Fatal for the run.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The store is temporarily unreachable; the caller may retry later.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Protocol or I/O failure.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Auth(msg) => Self::Auth(msg),
            RemoteError::Connectivity(msg) => Self::Connectivity(msg),
            RemoteError::Protocol(msg) => Self::Messaging(msg),
        }
    }
}

/// Metadata handle for one remote message, fetched before its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessageMeta {
    /// Unique id of the message within its folder.
    pub uid: String,
    /// Whether the message is flagged.
    pub flagged: bool,
}

/// An open remote mail folder.
pub trait RemoteFolder {
    /// Appends messages to the folder.
    async fn append(&mut self, messages: &[MessageArtifact]) -> Result<(), RemoteError>;

    /// Fetches metadata for up to `max` messages newer than the optional
    /// `floor` timestamp (epoch milliseconds), in remote sequence order,
    /// optionally restricted to flagged messages.
    async fn fetch_since(
        &mut self,
        floor: Option<i64>,
        max: Option<usize>,
        flagged_only: bool,
    ) -> Result<Vec<RemoteMessageMeta>, RemoteError>;

    /// Fetches the full message for a previously returned metadata handle.
    async fn fetch_body(&mut self, uid: &str) -> Result<MessageArtifact, RemoteError>;

    /// Releases the folder handle. Must be called on every exit path.
    async fn close(&mut self) -> Result<(), RemoteError>;
}

/// The remote mail-folder store.
pub trait RemoteStore {
    /// Folder handle type produced by [`RemoteStore::open`].
    type Folder: RemoteFolder;

    /// Whether login information has been configured at all. Checked before
    /// any network I/O is attempted.
    fn credentials_configured(&self) -> bool;

    /// Opens (creating if necessary) the named folder.
    async fn open(&mut self, folder: &str) -> Result<Self::Folder, RemoteError>;
}
