//! Collaborator traits for the local record store.

use serde::{Deserialize, Serialize};

use super::model::{MESSAGE_TYPE_SENT, Record, RecordIdentity, RecordKind};
use crate::Result;

/// Contact-group restriction applied when selecting records to back up.
///
/// The filter only applies to text messages; sent messages always pass it so
/// that outgoing conversation halves are never dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupFilter {
    /// No restriction.
    #[default]
    Everybody,
    /// Only records whose counterpart is one of these local contact ids.
    Contacts(Vec<i64>),
}

impl GroupFilter {
    /// Whether the filter restricts queries for the given kind at all.
    #[must_use]
    pub const fn applies_to(&self, kind: RecordKind) -> bool {
        matches!(self, Self::Contacts(_)) && matches!(kind, RecordKind::Sms)
    }

    /// Whether a record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        if !self.applies_to(record.kind) {
            return true;
        }
        if record.type_code == MESSAGE_TYPE_SENT {
            return true;
        }
        match self {
            Self::Everybody => true,
            Self::Contacts(ids) => record.contact_id.is_some_and(|id| ids.contains(&id)),
        }
    }
}

/// Queryable view of the local record store.
pub trait RecordSource {
    /// Returns records of `kind` newer than `since`, ascending by timestamp,
    /// capped at `max` entries (`None` means uncapped). Drafts and delivery
    /// reports are never returned.
    async fn query(
        &self,
        kind: RecordKind,
        since: i64,
        max: Option<usize>,
        filter: &GroupFilter,
    ) -> Result<Vec<Record>>;

    /// Timestamp of the newest record of `kind`, or `None` if there are none.
    async fn max_timestamp(&self, kind: RecordKind) -> Result<Option<i64>>;
}

/// Outcome of a local insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Record was inserted, with its new local id.
    Inserted(i64),
    /// A record with the same approximate identity already exists.
    AlreadyExists,
}

/// Insertion side of the local record store, used by restore.
pub trait LocalMessageStore {
    /// Whether a record with this approximate identity already exists.
    async fn exists(&self, identity: &RecordIdentity) -> Result<bool>;

    /// Inserts a record, unless a record with the same approximate identity
    /// already exists.
    async fn insert(&self, record: &Record) -> Result<InsertOutcome>;
}
