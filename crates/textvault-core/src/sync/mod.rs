//! Synchronization engines and run orchestration.
//!
//! A run is either a backup (local records out to the remote folder store)
//! or a restore (remote messages back into the local store). The
//! [`RunCoordinator`] enforces that at most one run is active per process
//! and carries the cooperative cancellation flag; the engines drive a run
//! from start to a terminal state and publish progress along the way.

mod backup;
mod config;
mod coordinator;
mod progress;
mod restore;

#[cfg(test)]
pub(crate) mod support;

pub use backup::{BackupEngine, BackupReport, CalendarEntry, CalendarSink, NoCalendarSink};
pub use config::{BackupConfig, RestoreConfig};
pub use coordinator::{CancelToken, RunCoordinator, RunGuard, RunKind};
pub use progress::{
    Notifier, ProgressEvent, ProgressReceiver, ProgressReporter, ProgressSender, SyncScheduler,
    SyncState, progress_channel,
};
pub use restore::{
    BodyDecryptor, DecryptOutcome, NoDecryptor, NoTransientCache, RestoreEngine, RestoreReport,
    TransientCache,
};
