//! In-memory test doubles for the engine collaborators.
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::backup::{CalendarEntry, CalendarSink};
use super::progress::SyncScheduler;
use super::restore::{BodyDecryptor, DecryptOutcome, TransientCache};
use crate::error::{Error, Result};
use crate::message::MessageArtifact;
use crate::record::{
    GroupFilter, InsertOutcome, LocalMessageStore, MESSAGE_TYPE_DRAFT, MMS_TYPE_DELIVERY_REPORT,
    Record, RecordIdentity, RecordKind, RecordSource,
};
use crate::remote::{RemoteError, RemoteFolder, RemoteMessageMeta, RemoteStore};
use crate::threads::{ThreadError, ThreadRegistry};
use crate::watermark::{SyncDirection, WatermarkStore};

/// Which remote error category an injected failure produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteFailure {
    Auth,
    Connectivity,
    Protocol,
}

impl RemoteFailure {
    fn to_error(self) -> RemoteError {
        match self {
            Self::Auth => RemoteError::Auth("injected".to_string()),
            Self::Connectivity => RemoteError::Connectivity("injected".to_string()),
            Self::Protocol => RemoteError::Protocol("injected".to_string()),
        }
    }
}

pub(crate) struct MemorySource {
    records: Vec<Record>,
}

impl MemorySource {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

fn excluded_from_backup(record: &Record) -> bool {
    match record.kind {
        RecordKind::Sms => record.type_code == MESSAGE_TYPE_DRAFT,
        RecordKind::Mms => record.type_code == MMS_TYPE_DELIVERY_REPORT,
        RecordKind::CallLog => false,
    }
}

impl RecordSource for MemorySource {
    async fn query(
        &self,
        kind: RecordKind,
        since: i64,
        max: Option<usize>,
        filter: &GroupFilter,
    ) -> Result<Vec<Record>> {
        let mut out: Vec<Record> = self
            .records
            .iter()
            .filter(|r| {
                r.kind == kind && r.timestamp > since && !excluded_from_backup(r) && filter.matches(r)
            })
            .cloned()
            .collect();
        out.sort_by_key(|r| r.timestamp);
        if let Some(max) = max {
            out.truncate(max);
        }
        Ok(out)
    }

    async fn max_timestamp(&self, kind: RecordKind) -> Result<Option<i64>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.timestamp)
            .max())
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    records: Mutex<Vec<Record>>,
}

impl MemoryStore {
    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

impl LocalMessageStore for MemoryStore {
    async fn exists(&self, identity: &RecordIdentity) -> Result<bool> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.identity() == *identity))
    }

    async fn insert(&self, record: &Record) -> Result<InsertOutcome> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.identity() == record.identity()) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        records.push(record.clone());
        Ok(InsertOutcome::Inserted(records.len() as i64))
    }
}

#[derive(Default)]
pub(crate) struct MemoryWatermarks {
    marks: Mutex<HashMap<(RecordKind, SyncDirection), i64>>,
}

impl MemoryWatermarks {
    pub(crate) fn value(&self, kind: RecordKind, direction: SyncDirection) -> Option<i64> {
        self.marks.lock().unwrap().get(&(kind, direction)).copied()
    }
}

impl WatermarkStore for MemoryWatermarks {
    async fn get(&self, kind: RecordKind, direction: SyncDirection) -> Result<Option<i64>> {
        Ok(self.value(kind, direction))
    }

    async fn set(&self, kind: RecordKind, direction: SyncDirection, timestamp: i64) -> Result<()> {
        self.marks
            .lock()
            .unwrap()
            .entry((kind, direction))
            .and_modify(|current| *current = (*current).max(timestamp))
            .or_insert(timestamp);
        Ok(())
    }

    async fn is_first_sync(&self) -> Result<bool> {
        Ok(!self
            .marks
            .lock()
            .unwrap()
            .keys()
            .any(|(_, direction)| *direction == SyncDirection::Backup))
    }
}

#[derive(Default)]
pub(crate) struct MemoryThreads {
    threads: Mutex<HashMap<String, i64>>,
    rebuilds: AtomicUsize,
    pub(crate) fail_lookup: bool,
}

impl MemoryThreads {
    pub(crate) fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}

impl ThreadRegistry for MemoryThreads {
    async fn get_or_create_thread(&self, address: &str) -> std::result::Result<i64, ThreadError> {
        if self.fail_lookup {
            return Err(ThreadError::Unavailable("injected".to_string()));
        }
        let mut threads = self.threads.lock().unwrap();
        let next = threads.len() as i64 + 1;
        Ok(*threads.entry(address.to_string()).or_insert(next))
    }

    async fn rebuild(&self) -> std::result::Result<(), ThreadError> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StoredMessage {
    artifact: MessageArtifact,
    flagged: bool,
}

#[derive(Default)]
pub(crate) struct FolderState {
    messages: Mutex<Vec<StoredMessage>>,
    closes: AtomicUsize,
}

impl FolderState {
    pub(crate) fn preload(&self, artifact: MessageArtifact, flagged: bool) {
        self.messages
            .lock()
            .unwrap()
            .push(StoredMessage { artifact, flagged });
    }

    pub(crate) fn artifacts(&self) -> Vec<MessageArtifact> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.artifact.clone())
            .collect()
    }

    pub(crate) fn artifact_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Remote store backed by named in-memory folders, with failure injection.
pub(crate) struct MemoryRemote {
    pub(crate) credentials: bool,
    pub(crate) fail_open: Option<RemoteFailure>,
    pub(crate) fail_append: Option<RemoteFailure>,
    pub(crate) fail_fetch_body: Option<RemoteFailure>,
    pub(crate) on_append: Option<Arc<dyn Fn(usize) + Send + Sync>>,
    opens: AtomicUsize,
    // Appends are counted across folders so a test can react to the n-th
    // append of a whole run.
    appends: Arc<AtomicUsize>,
    folders: Mutex<HashMap<String, Arc<FolderState>>>,
}

impl MemoryRemote {
    pub(crate) fn new() -> Self {
        Self {
            credentials: true,
            fail_open: None,
            fail_append: None,
            fail_fetch_body: None,
            on_append: None,
            opens: AtomicUsize::new(0),
            appends: Arc::new(AtomicUsize::new(0)),
            folders: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn folder(&self, name: &str) -> Arc<FolderState> {
        Arc::clone(
            self.folders
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_default(),
        )
    }

    pub(crate) fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl RemoteStore for MemoryRemote {
    type Folder = MemoryFolder;

    fn credentials_configured(&self) -> bool {
        self.credentials
    }

    async fn open(&mut self, folder: &str) -> std::result::Result<MemoryFolder, RemoteError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.fail_open {
            return Err(failure.to_error());
        }
        Ok(MemoryFolder {
            state: self.folder(folder),
            fail_append: self.fail_append,
            fail_fetch_body: self.fail_fetch_body,
            on_append: self.on_append.clone(),
            appends: Arc::clone(&self.appends),
        })
    }
}

pub(crate) struct MemoryFolder {
    state: Arc<FolderState>,
    fail_append: Option<RemoteFailure>,
    fail_fetch_body: Option<RemoteFailure>,
    on_append: Option<Arc<dyn Fn(usize) + Send + Sync>>,
    appends: Arc<AtomicUsize>,
}

impl RemoteFolder for MemoryFolder {
    async fn append(
        &mut self,
        messages: &[MessageArtifact],
    ) -> std::result::Result<(), RemoteError> {
        if let Some(failure) = self.fail_append {
            return Err(failure.to_error());
        }
        let mut stored = self.state.messages.lock().unwrap();
        for artifact in messages {
            stored.push(StoredMessage {
                artifact: artifact.clone(),
                flagged: false,
            });
        }
        drop(stored);
        let count = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(callback) = &self.on_append {
            callback(count);
        }
        Ok(())
    }

    async fn fetch_since(
        &mut self,
        _floor: Option<i64>,
        max: Option<usize>,
        flagged_only: bool,
    ) -> std::result::Result<Vec<RemoteMessageMeta>, RemoteError> {
        let messages = self.state.messages.lock().unwrap();
        let metas: Vec<RemoteMessageMeta> = messages
            .iter()
            .enumerate()
            .filter(|(_, m)| !flagged_only || m.flagged)
            .map(|(index, m)| RemoteMessageMeta {
                uid: index.to_string(),
                flagged: m.flagged,
            })
            .take(max.unwrap_or(usize::MAX))
            .collect();
        Ok(metas)
    }

    async fn fetch_body(&mut self, uid: &str) -> std::result::Result<MessageArtifact, RemoteError> {
        if let Some(failure) = self.fail_fetch_body {
            return Err(failure.to_error());
        }
        let messages = self.state.messages.lock().unwrap();
        uid.parse::<usize>()
            .ok()
            .and_then(|index| messages.get(index))
            .map(|m| m.artifact.clone())
            .ok_or_else(|| RemoteError::Protocol(format!("no such uid: {uid}")))
    }

    async fn close(&mut self) -> std::result::Result<(), RemoteError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingScheduler {
    calls: AtomicUsize,
}

impl RecordingScheduler {
    pub(crate) fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SyncScheduler for RecordingScheduler {
    fn schedule_next_sync(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingCalendar {
    pub(crate) fail: bool,
    entries: Mutex<Vec<CalendarEntry>>,
}

impl RecordingCalendar {
    pub(crate) fn entries(&self) -> Vec<CalendarEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl CalendarSink for RecordingCalendar {
    async fn add_entry(&self, entry: CalendarEntry) -> Result<()> {
        if self.fail {
            return Err(Error::Messaging("calendar unavailable".to_string()));
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct CountingCache {
    clears: AtomicUsize,
}

impl CountingCache {
    pub(crate) fn count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl TransientCache for CountingCache {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Decryptor that strips an `enc:` prefix, or reports failure leaving the
/// body untouched.
#[derive(Default)]
pub(crate) struct StubDecryptor {
    pub(crate) fail: bool,
}

impl BodyDecryptor for StubDecryptor {
    async fn decrypt(&self, body: &str) -> DecryptOutcome {
        if self.fail {
            return DecryptOutcome {
                body: body.to_string(),
                error: Some("bad passphrase".to_string()),
            };
        }
        DecryptOutcome {
            body: body.strip_prefix("enc:").unwrap_or(body).to_string(),
            error: None,
        }
    }
}
