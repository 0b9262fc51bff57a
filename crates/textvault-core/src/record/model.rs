//! Record data models.

use serde::{Deserialize, Serialize};

/// Type code of a received text message.
pub const MESSAGE_TYPE_RECEIVED: i32 = 1;
/// Type code of a sent text message.
pub const MESSAGE_TYPE_SENT: i32 = 2;
/// Type code of a draft, which is never backed up.
pub const MESSAGE_TYPE_DRAFT: i32 = 3;
/// Multimedia type code of a delivery report, which is never backed up.
pub const MMS_TYPE_DELIVERY_REPORT: i32 = 134;

/// Kind of local record eligible for synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Plain text message.
    Sms,
    /// Multimedia message.
    Mms,
    /// Call-log entry.
    CallLog,
}

impl RecordKind {
    /// All kinds, in backup priority order.
    pub const ALL: [Self; 3] = [Self::Sms, Self::Mms, Self::CallLog];

    /// Parse from the wire/storage string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SMS" => Some(Self::Sms),
            "MMS" => Some(Self::Mms),
            "CALLLOG" => Some(Self::CallLog),
            _ => None,
        }
    }

    /// Wire/storage string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Mms => "MMS",
            Self::CallLog => "CALLLOG",
        }
    }
}

/// Direction of a call-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    /// Incoming call.
    Incoming,
    /// Outgoing call.
    Outgoing,
    /// Missed call.
    Missed,
}

impl CallType {
    /// Numeric type code stored on the record.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Incoming => 1,
            Self::Outgoing => 2,
            Self::Missed => 3,
        }
    }

    /// Parse from a numeric type code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Incoming),
            2 => Some(Self::Outgoing),
            3 => Some(Self::Missed),
            _ => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
            Self::Missed => "missed",
        }
    }
}

/// A structured local item eligible for synchronization.
///
/// Timestamps are epoch milliseconds. The body is empty for call-log
/// entries; `duration` is set only for call-log entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// What kind of record this is.
    pub kind: RecordKind,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Direction/type code (message box for texts, call type for calls).
    pub type_code: i32,
    /// Counterpart address or phone number.
    pub address: String,
    /// Message body.
    pub body: String,
    /// Whether the record has been read locally.
    pub read: bool,
    /// Protocol identifier, if the platform recorded one.
    pub protocol: Option<String>,
    /// Service center address, if the platform recorded one.
    pub service_center: Option<String>,
    /// Delivery status, if the platform recorded one.
    pub status: Option<String>,
    /// Call duration in seconds (call-log entries only).
    pub duration: Option<u32>,
    /// Conversation thread this record belongs to, if resolved.
    pub thread_id: Option<i64>,
    /// Local contact id of the counterpart, if known.
    pub contact_id: Option<i64>,
}

impl Record {
    /// Creates a text-message record with the given essentials.
    #[must_use]
    pub fn sms(timestamp: i64, type_code: i32, address: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Sms,
            timestamp,
            type_code,
            address: address.into(),
            body: body.into(),
            read: true,
            protocol: None,
            service_center: None,
            status: None,
            duration: None,
            thread_id: None,
            contact_id: None,
        }
    }

    /// Creates a call-log record.
    #[must_use]
    pub fn call(timestamp: i64, call_type: CallType, address: impl Into<String>, duration: u32) -> Self {
        Self {
            kind: RecordKind::CallLog,
            timestamp,
            type_code: call_type.code(),
            address: address.into(),
            body: String::new(),
            read: true,
            protocol: None,
            service_center: None,
            status: None,
            duration: Some(duration),
            thread_id: None,
            contact_id: None,
        }
    }

    /// The approximate identity used for dedup on restore.
    #[must_use]
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity {
            timestamp: self.timestamp,
            address: self.address.clone(),
            type_code: self.type_code,
        }
    }

    /// Whether the record may be re-inserted on restore.
    ///
    /// Anything that is not plainly received or sent could get re-queued for
    /// outbound sending by the platform, so it is rejected.
    #[must_use]
    pub const fn is_restorable(&self) -> bool {
        self.type_code == MESSAGE_TYPE_RECEIVED || self.type_code == MESSAGE_TYPE_SENT
    }
}

/// Approximate record identity: two records sharing this tuple are treated
/// as the same record for restore dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordIdentity {
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// Counterpart address.
    pub address: String,
    /// Direction/type code.
    pub type_code: i32,
}
