//! Run states, progress events, and the reporting channel.

use tokio::sync::mpsc;

use crate::Error;

/// State of a synchronization run.
///
/// A run moves through the transient states in order and ends in exactly one
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    /// No run is active.
    Idle,
    /// Opening the remote store.
    Login,
    /// Determining the set of items to transfer.
    Calc,
    /// Transferring local records to the remote folder.
    Backup,
    /// Transferring remote messages into the local store.
    Restore,
    /// Recomputing conversation-thread metadata after a restore.
    UpdatingThreads,
    /// Terminal: the run completed.
    Finished,
    /// Terminal: the run was canceled by the user.
    Canceled,
    /// Terminal: the run failed for an unclassified reason.
    GeneralError,
    /// Terminal: the remote store rejected the credentials.
    AuthFailed,
    /// Terminal: the remote store was unreachable.
    ConnectivityError,
}

impl SyncState {
    /// Whether this state ends a run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Finished
                | Self::Canceled
                | Self::GeneralError
                | Self::AuthFailed
                | Self::ConnectivityError
        )
    }

    /// Short user-facing description.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Login => "logging in",
            Self::Calc => "calculating",
            Self::Backup => "backing up",
            Self::Restore => "restoring",
            Self::UpdatingThreads => "updating threads",
            Self::Finished => "finished",
            Self::Canceled => "canceled",
            Self::GeneralError => "synchronization failed",
            Self::AuthFailed => "authentication failed",
            Self::ConnectivityError => "no connection to the server",
        }
    }

    /// Terminal state corresponding to a run-aborting error.
    #[must_use]
    pub const fn for_error(error: &Error) -> Self {
        match error {
            Error::Auth(_) => Self::AuthFailed,
            Error::Connectivity(_) => Self::ConnectivityError,
            _ => Self::GeneralError,
        }
    }
}

/// One progress update published by a running engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Current run state.
    pub state: SyncState,
    /// Items handled so far.
    pub current: usize,
    /// Items planned for this run, `0` while still unknown.
    pub total: usize,
    /// Error description, set only for failure states.
    pub error: Option<String>,
}

/// Sending half of the progress channel.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of the progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Creates the channel a run publishes its progress events on.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Out-of-band notification sink for failures of unattended runs.
pub trait Notifier {
    /// Reports a terminal failure state to the user.
    fn notify(&self, state: SyncState, message: &str);
}

/// Scheduling hook invoked when a run reaches a terminal state, so the next
/// regular sync gets queued no matter how this one ended.
pub trait SyncScheduler {
    /// Queues the next regular synchronization.
    fn schedule_next_sync(&self);
}

/// Publishes progress for one run.
///
/// Transient states and successful completion always go to the progress
/// channel. Failure states go to the notifier instead when the run is
/// unattended, since nobody is watching the channel.
pub struct ProgressReporter<'a> {
    sender: &'a ProgressSender,
    notifier: Option<&'a dyn Notifier>,
    background: bool,
}

impl<'a> ProgressReporter<'a> {
    /// Creates a reporter for one run.
    #[must_use]
    pub const fn new(
        sender: &'a ProgressSender,
        notifier: Option<&'a dyn Notifier>,
        background: bool,
    ) -> Self {
        Self {
            sender,
            notifier,
            background,
        }
    }

    /// Publishes a state change or progress tick.
    pub fn publish(&self, state: SyncState, current: usize, total: usize) {
        // A dropped receiver is not an error; the run keeps going.
        let _ = self.sender.send(ProgressEvent {
            state,
            current,
            total,
            error: None,
        });
    }

    /// Publishes a terminal failure.
    pub fn publish_error(&self, state: SyncState, message: &str) {
        if self.background {
            if let Some(notifier) = self.notifier {
                notifier.notify(state, message);
                return;
            }
        }
        let _ = self.sender.send(ProgressEvent {
            state,
            current: 0,
            total: 0,
            error: Some(message.to_string()),
        });
    }
}
