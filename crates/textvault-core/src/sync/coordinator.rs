//! Mutual exclusion and cooperative cancellation of runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Kind of synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Local records out to the remote store.
    Backup,
    /// Remote messages back into the local store.
    Restore,
}

impl RunKind {
    /// Log-friendly name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    active: Mutex<Option<RunKind>>,
    cancel_backup: AtomicBool,
    cancel_restore: AtomicBool,
}

impl Inner {
    const fn cancel_flag(&self, kind: RunKind) -> &AtomicBool {
        match kind {
            RunKind::Backup => &self.cancel_backup,
            RunKind::Restore => &self.cancel_restore,
        }
    }
}

/// Process-wide run coordinator.
///
/// At most one run, of either kind, is active at a time. Acquisition yields
/// a [`RunGuard`] whose drop releases the slot exactly once, so every exit
/// path of an engine releases correctly. Canceling an inactive kind is a
/// no-op.
#[derive(Debug, Clone, Default)]
pub struct RunCoordinator {
    inner: Arc<Inner>,
}

impl RunCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the run slot, or returns `None` if any run is already active.
    #[must_use]
    pub fn try_acquire(&self, kind: RunKind) -> Option<RunGuard> {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            debug!(requested = kind.as_str(), "run slot busy, request rejected");
            return None;
        }
        *active = Some(kind);
        Some(RunGuard {
            inner: Arc::clone(&self.inner),
            kind,
        })
    }

    /// Requests cooperative cancellation of the active run, if it is of the
    /// given kind.
    pub fn cancel(&self, kind: RunKind) {
        let active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *active == Some(kind) {
            debug!(kind = kind.as_str(), "cancellation requested");
            self.inner.cancel_flag(kind).store(true, Ordering::SeqCst);
        }
    }

    /// Whether a run of the given kind is currently active.
    #[must_use]
    pub fn is_running(&self, kind: RunKind) -> bool {
        self.active() == Some(kind)
    }

    /// The kind of the currently active run, if any.
    #[must_use]
    pub fn active(&self) -> Option<RunKind> {
        *self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive claim on the run slot. Dropping the guard releases the slot
/// and clears the cancellation flag for its kind.
#[derive(Debug)]
pub struct RunGuard {
    inner: Arc<Inner>,
    kind: RunKind,
}

impl RunGuard {
    /// The kind this guard was acquired for.
    #[must_use]
    pub const fn kind(&self) -> RunKind {
        self.kind
    }

    /// A token the engine polls between items.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken {
            inner: Arc::clone(&self.inner),
            kind: self.kind,
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active = None;
        self.inner.cancel_flag(self.kind).store(false, Ordering::SeqCst);
    }
}

/// Cancellation flag of one run, polled cooperatively by the engine.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
    kind: RunKind,
}

impl CancelToken {
    /// Whether cancellation has been requested for this run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel_flag(self.kind).load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_mutually_exclusive() {
        let coordinator = RunCoordinator::new();

        let guard = coordinator.try_acquire(RunKind::Backup);
        assert!(guard.is_some());
        assert!(coordinator.is_running(RunKind::Backup));

        // Neither kind can start while a run is active.
        assert!(coordinator.try_acquire(RunKind::Backup).is_none());
        assert!(coordinator.try_acquire(RunKind::Restore).is_none());

        drop(guard);
        assert_eq!(coordinator.active(), None);
        assert!(coordinator.try_acquire(RunKind::Restore).is_some());
    }

    #[test]
    fn cancel_targets_the_active_kind_only() {
        let coordinator = RunCoordinator::new();
        let guard = coordinator.try_acquire(RunKind::Backup).map(|g| {
            let token = g.cancel_token();
            (g, token)
        });
        let (guard, token) = guard.expect("slot was free");

        coordinator.cancel(RunKind::Restore);
        assert!(!token.is_cancelled());

        coordinator.cancel(RunKind::Backup);
        assert!(token.is_cancelled());
        drop(guard);
    }

    #[test]
    fn cancel_flag_resets_on_release() {
        let coordinator = RunCoordinator::new();
        let guard = coordinator.try_acquire(RunKind::Backup).expect("slot was free");
        coordinator.cancel(RunKind::Backup);
        drop(guard);

        let guard = coordinator.try_acquire(RunKind::Backup).expect("slot was free");
        assert!(!guard.cancel_token().is_cancelled());
    }

    #[test]
    fn cancel_while_idle_is_a_no_op() {
        let coordinator = RunCoordinator::new();
        coordinator.cancel(RunKind::Backup);

        let guard = coordinator.try_acquire(RunKind::Backup).expect("slot was free");
        assert!(!guard.cancel_token().is_cancelled());
    }
}
