//! # textvault-core
//!
//! Incremental synchronization engine backing up structured local records
//! (text messages, multimedia messages, call-log entries) to a remote
//! mail-folder store, and restoring them back into the local store.
//!
//! This crate provides:
//! - Watermark-driven incremental backup with a per-run item budget
//! - Restore with duplicate detection and conversation-thread resolution
//! - Record to mail-message conversion and back
//! - Run coordination (mutual exclusion, cooperative cancellation)
//! - Local storage (`SQLite`)
//!
//! The remote store itself is a collaborator: callers supply an
//! implementation of [`RemoteStore`] (an IMAP account, a test double, ...).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod convert;
mod error;
pub mod lru;
pub mod message;
pub mod record;
pub mod remote;
pub mod sync;
pub mod threads;
pub mod watermark;

pub use convert::{
    ConversionResult, ConvertError, MessageConverter, detect_kind, is_encrypted, message_to_record,
};
pub use error::{Error, Result};
pub use message::{Headers, MessageArtifact};
pub use record::{
    CallType, GroupFilter, InsertOutcome, LocalMessageStore, MessageRepository, Record,
    RecordIdentity, RecordKind, RecordSource,
};
pub use remote::{RemoteError, RemoteFolder, RemoteMessageMeta, RemoteStore};
pub use sync::{
    BackupConfig, BackupEngine, BackupReport, BodyDecryptor, CalendarEntry, CalendarSink,
    CancelToken, DecryptOutcome, NoCalendarSink, NoDecryptor, NoTransientCache, Notifier,
    ProgressEvent, ProgressReceiver, ProgressReporter, ProgressSender, RestoreConfig,
    RestoreEngine, RestoreReport, RunCoordinator, RunGuard, RunKind, SyncScheduler, SyncState,
    TransientCache, progress_channel,
};
pub use threads::{ThreadError, ThreadRegistry, ThreadRepository, ThreadResolver};
pub use watermark::{EPOCH, SyncDirection, WatermarkRepository, WatermarkStore};
