//! The backup engine.
//!
//! Drives one backup run: select new records under the per-run budget,
//! convert them, append them to the remote folders, and advance the
//! watermarks one record at a time so an interrupted run never loses
//! ground.

use tracing::{debug, error, info, warn};

use super::config::BackupConfig;
use super::coordinator::CancelToken;
use super::progress::{ProgressReporter, SyncScheduler, SyncState};
use crate::convert::{MessageConverter, call_log_body};
use crate::error::{Error, Result};
use crate::record::{GroupFilter, Record, RecordKind, RecordSource};
use crate::remote::{RemoteFolder, RemoteStore};
use crate::watermark::{EPOCH, SyncDirection, WatermarkStore};

/// A calendar entry mirroring one backed-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    /// Call timestamp, epoch milliseconds.
    pub timestamp: i64,
    /// Call duration in seconds.
    pub duration_secs: u32,
    /// Entry title.
    pub title: String,
    /// Entry description.
    pub description: String,
}

/// Optional sink mirroring backed-up calls into a calendar.
///
/// Mirroring is best effort: a failing sink is logged and never aborts the
/// run.
pub trait CalendarSink {
    /// Adds one entry.
    async fn add_entry(&self, entry: CalendarEntry) -> Result<()>;
}

/// Sink used when call mirroring is not configured.
pub struct NoCalendarSink;

impl CalendarSink for NoCalendarSink {
    async fn add_entry(&self, _entry: CalendarEntry) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a backup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    /// Terminal state the run ended in.
    pub state: SyncState,
    /// Records appended remotely.
    pub synced: usize,
    /// Records that were selected for this run.
    pub total: usize,
}

/// Drives one backup run to a terminal state.
pub struct BackupEngine<'a, S, R, W, C> {
    source: &'a S,
    remote: &'a mut R,
    watermarks: &'a W,
    calendar: &'a C,
    config: &'a BackupConfig,
    converter: MessageConverter,
    reporter: ProgressReporter<'a>,
    synced: usize,
    total: usize,
}

impl<'a, S, R, W, C> BackupEngine<'a, S, R, W, C>
where
    S: RecordSource,
    R: RemoteStore,
    W: WatermarkStore,
    C: CalendarSink,
{
    /// Creates an engine for one run.
    pub fn new(
        source: &'a S,
        remote: &'a mut R,
        watermarks: &'a W,
        calendar: &'a C,
        config: &'a BackupConfig,
        reporter: ProgressReporter<'a>,
    ) -> Self {
        let converter = MessageConverter::new(config.owner_email.clone());
        Self {
            source,
            remote,
            watermarks,
            calendar,
            config,
            converter,
            reporter,
            synced: 0,
            total: 0,
        }
    }

    /// Runs the backup to completion, cancellation, or failure.
    ///
    /// The next regular sync is scheduled on every terminal path.
    pub async fn run(mut self, cancel: &CancelToken, scheduler: &impl SyncScheduler) -> BackupReport {
        let outcome = self.execute(cancel).await;
        scheduler.schedule_next_sync();
        let state = match outcome {
            Ok(true) => {
                info!(synced = self.synced, total = self.total, "backup canceled");
                self.reporter.publish(SyncState::Canceled, self.synced, self.total);
                SyncState::Canceled
            }
            Ok(false) => {
                info!(synced = self.synced, "backup finished");
                self.reporter.publish(SyncState::Finished, self.synced, self.total);
                SyncState::Finished
            }
            Err(err) => {
                let state = SyncState::for_error(&err);
                error!(error = %err, "backup failed");
                self.reporter.publish_error(state, &err.to_string());
                state
            }
        };
        BackupReport {
            state,
            synced: self.synced,
            total: self.total,
        }
    }

    /// Skips everything currently pending: advances every backup watermark
    /// to the newest local record without transferring anything.
    pub async fn skip(self, scheduler: &impl SyncScheduler) -> BackupReport {
        let outcome = self.advance_to_present().await;
        scheduler.schedule_next_sync();
        let state = match outcome {
            Ok(()) => {
                info!("backup skipped, watermarks advanced to newest records");
                self.reporter.publish(SyncState::Finished, 0, 0);
                SyncState::Finished
            }
            Err(err) => {
                let state = SyncState::for_error(&err);
                error!(error = %err, "skip failed");
                self.reporter.publish_error(state, &err.to_string());
                state
            }
        };
        BackupReport {
            state,
            synced: 0,
            total: 0,
        }
    }

    async fn advance_to_present(&self) -> Result<()> {
        for kind in RecordKind::ALL {
            let timestamp = self.source.max_timestamp(kind).await?.unwrap_or(EPOCH);
            self.watermarks
                .set(kind, SyncDirection::Backup, timestamp)
                .await?;
        }
        Ok(())
    }

    /// Returns `Ok(true)` when the run was canceled, `Ok(false)` when it
    /// ran to completion.
    async fn execute(&mut self, cancel: &CancelToken) -> Result<bool> {
        let budget = self.config.max_items_per_sync;
        let sms = self.query_kind(RecordKind::Sms, budget).await?;
        let mms = if self.config.include_mms {
            self.query_kind(RecordKind::Mms, remaining(budget, sms.len()))
                .await?
        } else {
            Vec::new()
        };
        let calls = if self.config.include_call_log {
            self.query_kind(RecordKind::CallLog, remaining(budget, sms.len() + mms.len()))
                .await?
        } else {
            Vec::new()
        };

        self.total = sms.len() + mms.len() + calls.len();
        info!(
            sms = sms.len(),
            mms = mms.len(),
            calls = calls.len(),
            total = self.total,
            "backup items selected"
        );

        if self.total == 0 {
            if self.watermarks.is_first_sync().await? {
                debug!("first backup found nothing to do, writing baseline watermarks");
                self.watermarks
                    .set(RecordKind::Sms, SyncDirection::Backup, EPOCH)
                    .await?;
                self.watermarks
                    .set(RecordKind::Mms, SyncDirection::Backup, EPOCH)
                    .await?;
            }
            return Ok(false);
        }

        if !self.remote.credentials_configured() {
            return Err(Error::MissingCredentials);
        }

        self.reporter.publish(SyncState::Login, 0, self.total);
        let mut message_folder = self.remote.open(&self.config.message_folder).await?;
        let result = self.transfer(cancel, &mut message_folder, sms, mms, calls).await;
        if let Err(err) = message_folder.close().await {
            warn!(error = %err, "failed to close message folder");
        }
        result
    }

    async fn transfer(
        &mut self,
        cancel: &CancelToken,
        message_folder: &mut R::Folder,
        sms: Vec<Record>,
        mms: Vec<Record>,
        calls: Vec<Record>,
    ) -> Result<bool> {
        let mut call_folder = if calls.is_empty() {
            None
        } else {
            Some(self.remote.open(&self.config.call_log_folder).await?)
        };
        let result = self
            .drain(cancel, message_folder, call_folder.as_mut(), sms, mms, calls)
            .await;
        if let Some(folder) = call_folder.as_mut() {
            if let Err(err) = folder.close().await {
                warn!(error = %err, "failed to close call-log folder");
            }
        }
        result
    }

    async fn drain(
        &mut self,
        cancel: &CancelToken,
        message_folder: &mut R::Folder,
        mut call_folder: Option<&mut R::Folder>,
        sms: Vec<Record>,
        mms: Vec<Record>,
        calls: Vec<Record>,
    ) -> Result<bool> {
        self.reporter.publish(SyncState::Calc, 0, self.total);
        let mut sms = sms.into_iter();
        let mut mms = mms.into_iter();
        let mut calls = calls.into_iter();

        loop {
            if cancel.is_cancelled() {
                return Ok(true);
            }

            // Strict priority: text messages, then multimedia, then calls.
            let (kind, record) = if let Some(record) = sms.next() {
                (RecordKind::Sms, record)
            } else if let Some(record) = mms.next() {
                (RecordKind::Mms, record)
            } else if let Some(record) = calls.next() {
                (RecordKind::CallLog, record)
            } else {
                return Ok(false);
            };

            debug!(kind = kind.as_str(), timestamp = record.timestamp, "backing up record");

            // One record per batch, so the watermark only ever covers
            // records that were actually appended.
            let batch = self
                .converter
                .records_to_messages(std::slice::from_ref(&record), kind);
            match kind {
                RecordKind::Sms | RecordKind::Mms => {
                    message_folder.append(&batch.messages).await?;
                }
                RecordKind::CallLog => {
                    if let Some(folder) = &mut call_folder {
                        folder.append(&batch.messages).await?;
                    }
                    if self.config.mirror_calls_to_calendar {
                        self.mirror_call(&record).await;
                    }
                }
            }
            self.watermarks
                .set(kind, SyncDirection::Backup, batch.max_timestamp)
                .await?;
            self.synced += batch.messages.len();
            self.reporter.publish(SyncState::Backup, self.synced, self.total);
        }
    }

    async fn query_kind(&self, kind: RecordKind, max: Option<usize>) -> Result<Vec<Record>> {
        if max == Some(0) {
            return Ok(Vec::new());
        }
        let since = self
            .watermarks
            .get(kind, SyncDirection::Backup)
            .await?
            .unwrap_or(EPOCH);
        let filter = if kind == RecordKind::Sms {
            &self.config.group_filter
        } else {
            &GroupFilter::Everybody
        };
        self.source.query(kind, since, max, filter).await
    }

    async fn mirror_call(&self, record: &Record) {
        let entry = CalendarEntry {
            timestamp: record.timestamp,
            duration_secs: record.duration.unwrap_or(0),
            title: format!("Call with {}", record.address),
            description: call_log_body(record),
        };
        if let Err(err) = self.calendar.add_entry(entry).await {
            warn!(error = %err, "calendar mirror failed, continuing");
        }
    }
}

fn remaining(budget: Option<usize>, used: usize) -> Option<usize> {
    budget.map(|limit| limit.saturating_sub(used))
}
