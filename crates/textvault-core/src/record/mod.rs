//! Local record model and storage.

mod model;
mod repository;
mod source;

pub use model::{
    CallType, MESSAGE_TYPE_DRAFT, MESSAGE_TYPE_RECEIVED, MESSAGE_TYPE_SENT,
    MMS_TYPE_DELIVERY_REPORT, Record, RecordIdentity, RecordKind,
};
pub use repository::MessageRepository;
pub use source::{GroupFilter, InsertOutcome, LocalMessageStore, RecordSource};
