//! The restore engine.
//!
//! Drives one restore run: list candidate messages in the remote folder,
//! fetch and reconstruct each one, and insert it locally unless a record
//! with the same approximate identity already exists. Per-item problems
//! are logged and skipped; only authentication and connectivity failures
//! abort the run.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::config::RestoreConfig;
use super::coordinator::CancelToken;
use super::progress::{ProgressReporter, SyncScheduler, SyncState};
use crate::convert::{detect_kind, is_encrypted, message_to_record};
use crate::error::Result;
use crate::record::{InsertOutcome, LocalMessageStore, RecordKind};
use crate::remote::{RemoteError, RemoteFolder, RemoteMessageMeta, RemoteStore};
use crate::threads::{ThreadRegistry, ThreadResolver};
use crate::watermark::{EPOCH, SyncDirection, WatermarkStore};

/// Transient platform caches are cleared after this many processed items.
pub const CACHE_CLEAR_INTERVAL: usize = 50;

/// Minimum time between per-item progress events.
pub const PROGRESS_PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

/// Result of a body decryption attempt.
///
/// Decryption never fails the item: `body` is always usable, and a set
/// `error` only means the returned body may still be ciphertext.
#[derive(Debug, Clone)]
pub struct DecryptOutcome {
    /// Body to store.
    pub body: String,
    /// Description of a decryption problem, if one occurred.
    pub error: Option<String>,
}

/// Decrypts message bodies that carry the encryption marker.
pub trait BodyDecryptor {
    /// Decrypts one body.
    async fn decrypt(&self, body: &str) -> DecryptOutcome;
}

/// Decryptor used when no decryption service is configured. Bodies pass
/// through unchanged.
pub struct NoDecryptor;

impl BodyDecryptor for NoDecryptor {
    async fn decrypt(&self, body: &str) -> DecryptOutcome {
        DecryptOutcome {
            body: body.to_string(),
            error: None,
        }
    }
}

/// Transient platform caches flushed periodically during bulk insertion.
pub trait TransientCache {
    /// Flushes the caches.
    fn clear(&self);
}

/// Cache handle used when the platform has nothing to flush.
pub struct NoTransientCache;

impl TransientCache for NoTransientCache {
    fn clear(&self) {}
}

/// Outcome of a restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Terminal state the run ended in.
    pub state: SyncState,
    /// Records newly inserted into the local store.
    pub restored: usize,
    /// Candidate messages that did not produce an insertion.
    pub duplicates: usize,
}

/// Drives one restore run to a terminal state.
pub struct RestoreEngine<'a, R, L, W, T, D, K> {
    remote: &'a mut R,
    store: &'a L,
    watermarks: &'a W,
    registry: &'a T,
    decryptor: &'a D,
    cache: &'a K,
    config: &'a RestoreConfig,
    reporter: ProgressReporter<'a>,
    seen: HashSet<String>,
    inserted: HashSet<i64>,
}

impl<'a, R, L, W, T, D, K> RestoreEngine<'a, R, L, W, T, D, K>
where
    R: RemoteStore,
    L: LocalMessageStore,
    W: WatermarkStore,
    T: ThreadRegistry,
    D: BodyDecryptor,
    K: TransientCache,
{
    /// Creates an engine for one run.
    pub fn new(
        remote: &'a mut R,
        store: &'a L,
        watermarks: &'a W,
        registry: &'a T,
        decryptor: &'a D,
        cache: &'a K,
        config: &'a RestoreConfig,
        reporter: ProgressReporter<'a>,
    ) -> Self {
        Self {
            remote,
            store,
            watermarks,
            registry,
            decryptor,
            cache,
            config,
            reporter,
            seen: HashSet::new(),
            inserted: HashSet::new(),
        }
    }

    /// Runs the restore to completion, cancellation, or failure.
    ///
    /// The next regular sync is scheduled on every terminal path.
    pub async fn run(mut self, cancel: &CancelToken, scheduler: &impl SyncScheduler) -> RestoreReport {
        let outcome = self.execute(cancel).await;
        scheduler.schedule_next_sync();
        let restored = self.inserted.len();
        let duplicates = self.seen.len().saturating_sub(restored);
        let state = match outcome {
            Ok(true) => {
                info!(restored, "restore canceled");
                self.reporter.publish(SyncState::Canceled, restored, self.seen.len());
                SyncState::Canceled
            }
            Ok(false) => {
                info!(restored, duplicates, "restore finished");
                self.reporter.publish(SyncState::Finished, restored, self.seen.len());
                SyncState::Finished
            }
            Err(err) => {
                let state = SyncState::for_error(&err);
                error!(error = %err, "restore failed");
                self.reporter.publish_error(state, &err.to_string());
                state
            }
        };
        RestoreReport {
            state,
            restored,
            duplicates,
        }
    }

    async fn execute(&mut self, cancel: &CancelToken) -> Result<bool> {
        self.reporter.publish(SyncState::Login, 0, 0);
        let mut folder = self.remote.open(&self.config.message_folder).await?;
        let result = self.drain(cancel, &mut folder).await;
        if let Err(err) = folder.close().await {
            warn!(error = %err, "failed to close message folder");
        }
        result
    }

    async fn drain(&mut self, cancel: &CancelToken, folder: &mut R::Folder) -> Result<bool> {
        self.reporter.publish(SyncState::Calc, 0, 0);
        let metas = folder
            .fetch_since(self.config.floor, self.config.max_items, self.config.flagged_only)
            .await?;
        let total = self
            .config
            .max_items
            .map_or(metas.len(), |max| metas.len().min(max));
        info!(total, "messages selected for restore");

        let mut resolver = ThreadResolver::new(self.registry);
        let mut restore_mark = self
            .watermarks
            .get(RecordKind::Sms, SyncDirection::Restore)
            .await?
            .unwrap_or(EPOCH);
        let mut last_published = Instant::now();

        let mut canceled = false;
        for (index, meta) in metas.iter().take(total).enumerate() {
            if cancel.is_cancelled() {
                canceled = true;
                break;
            }
            // Bulk insertion churns through platform caches; the clear at
            // index zero also flushes whatever predates the run.
            if index % CACHE_CLEAR_INTERVAL == 0 {
                self.cache.clear();
            }
            self.seen.insert(meta.uid.clone());
            self.import(folder, &mut resolver, meta, &mut restore_mark)
                .await?;

            if last_published.elapsed() >= PROGRESS_PUBLISH_INTERVAL {
                self.reporter.publish(SyncState::Restore, index + 1, total);
                last_published = Instant::now();
            }
        }

        // Records inserted before a cancellation leave thread metadata
        // stale, so the rebuild runs even when the loop was cut short.
        if !canceled || !self.inserted.is_empty() {
            self.reporter.publish(SyncState::UpdatingThreads, self.seen.len(), total);
            if let Err(err) = self.registry.rebuild().await {
                warn!(error = %err, "thread rebuild failed");
            }
        }
        Ok(canceled)
    }

    async fn import(
        &mut self,
        folder: &mut R::Folder,
        resolver: &mut ThreadResolver<'_, T>,
        meta: &RemoteMessageMeta,
        restore_mark: &mut i64,
    ) -> Result<()> {
        let artifact = match folder.fetch_body(&meta.uid).await {
            Ok(artifact) => artifact,
            Err(err @ (RemoteError::Auth(_) | RemoteError::Connectivity(_))) => {
                return Err(err.into());
            }
            Err(err) => {
                warn!(uid = %meta.uid, error = %err, "failed to fetch message, skipping");
                return Ok(());
            }
        };

        let Some(kind) = detect_kind(&artifact.headers) else {
            debug!(uid = %meta.uid, "unknown datatype, skipping");
            return Ok(());
        };
        if kind != RecordKind::Sms {
            debug!(uid = %meta.uid, kind = kind.as_str(), "not a text message, skipping");
            return Ok(());
        }

        let mut record = match message_to_record(&artifact) {
            Ok(record) => record,
            Err(err) => {
                warn!(uid = %meta.uid, error = %err, "malformed message, skipping");
                return Ok(());
            }
        };
        if !record.is_restorable() {
            debug!(uid = %meta.uid, type_code = record.type_code, "non-restorable type, skipping");
            return Ok(());
        }

        if is_encrypted(&artifact.headers) {
            let outcome = self.decryptor.decrypt(&record.body).await;
            if let Some(problem) = outcome.error {
                warn!(uid = %meta.uid, error = %problem, "decryption failed, storing body as returned");
            }
            record.body = outcome.body;
        }

        if self.store.exists(&record.identity()).await? {
            debug!(uid = %meta.uid, "already present locally, skipping");
            return Ok(());
        }

        if self.config.mark_as_read {
            record.read = true;
        }
        record.thread_id = resolver.resolve(&record.address).await;

        match self.store.insert(&record).await? {
            InsertOutcome::Inserted(id) => {
                self.inserted.insert(id);
                if record.timestamp > *restore_mark {
                    self.watermarks
                        .set(RecordKind::Sms, SyncDirection::Restore, record.timestamp)
                        .await?;
                    *restore_mark = record.timestamp;
                }
            }
            InsertOutcome::AlreadyExists => {}
        }
        Ok(())
    }
}
