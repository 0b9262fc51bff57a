//! Bidirectional conversion between records and message artifacts.
//!
//! The forward transform batches records into message groups and reports the
//! maximum timestamp of the batch, which becomes the new watermark once the
//! batch has been appended remotely. The reverse transform reconstructs a
//! record purely from the header set, accepting both the current and the
//! legacy header schemes.

use chrono::{DateTime, Utc};

use crate::message::{Headers, MessageArtifact, header};
use crate::record::{CallType, MESSAGE_TYPE_SENT, Record, RecordKind};
use crate::watermark::EPOCH;

/// Errors produced while reconstructing a record from an artifact.
///
/// These are per-item errors: the affected item is logged and skipped, they
/// never abort a run.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A required header is absent.
    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    /// A header value could not be parsed.
    #[error("invalid value for header {name}: {value:?}")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// An ordered group of message artifacts produced from one or more records,
/// plus the maximum timestamp among the source records.
///
/// `max_timestamp` is only usable as the new watermark if every record of
/// the batch was successfully included and appended.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Messages in source-record order.
    pub messages: Vec<MessageArtifact>,
    /// Maximum timestamp among the source records, [`EPOCH`] for an empty batch.
    pub max_timestamp: i64,
    /// Record kind that produced this batch.
    pub kind: RecordKind,
}

/// Converts between records and message artifacts.
#[derive(Debug, Clone)]
pub struct MessageConverter {
    owner_email: String,
}

impl MessageConverter {
    /// Creates a converter producing messages owned by `owner_email`.
    #[must_use]
    pub fn new(owner_email: impl Into<String>) -> Self {
        Self {
            owner_email: owner_email.into(),
        }
    }

    /// Converts a batch of records of one kind into message artifacts.
    #[must_use]
    pub fn records_to_messages(&self, records: &[Record], kind: RecordKind) -> ConversionResult {
        let mut messages = Vec::with_capacity(records.len());
        let mut max_timestamp = EPOCH;
        for record in records {
            messages.push(self.to_artifact(record, kind));
            max_timestamp = max_timestamp.max(record.timestamp);
        }
        ConversionResult {
            messages,
            max_timestamp,
            kind,
        }
    }

    fn to_artifact(&self, record: &Record, kind: RecordKind) -> MessageArtifact {
        let mut headers = Headers::new();
        let counterpart = &record.address;

        // Standard mail headers for human consumption of the folder.
        if is_outbound(record) {
            headers.set("From", self.owner_email.clone());
            headers.set("To", counterpart.clone());
        } else {
            headers.set("From", counterpart.clone());
            headers.set("To", self.owner_email.clone());
        }
        headers.set("Subject", subject_for(record, kind));
        headers.set("Date", rfc2822_date(record.timestamp));

        // The custom header set fully determines the record on restore.
        headers.set(header::ADDRESS, counterpart.clone());
        headers.set(header::TYPE, record.type_code.to_string());
        headers.set(header::DATE, record.timestamp.to_string());
        headers.set(header::READ, if record.read { "1" } else { "0" });
        headers.set(header::DATATYPE, kind.as_str());
        if let Some(protocol) = &record.protocol {
            headers.set(header::PROTOCOL, protocol.clone());
        }
        if let Some(service_center) = &record.service_center {
            headers.set(header::SERVICE_CENTER, service_center.clone());
        }
        if let Some(status) = &record.status {
            headers.set(header::STATUS, status.clone());
        }

        let body = match kind {
            RecordKind::Sms | RecordKind::Mms => record.body.clone(),
            RecordKind::CallLog => call_log_body(record),
        };
        MessageArtifact::new(headers, body)
    }
}

/// Reconstructs a text-message record from an artifact's headers and body.
///
/// Callers are expected to have routed non-SMS artifacts away via
/// [`detect_kind`] first.
///
/// # Errors
///
/// Returns an error if the date or type header is absent or unparseable.
pub fn message_to_record(artifact: &MessageArtifact) -> Result<Record, ConvertError> {
    let headers = &artifact.headers;
    let timestamp = parse_header::<i64>(headers, header::DATE)?;
    let type_code = parse_header::<i32>(headers, header::TYPE)?;

    Ok(Record {
        kind: RecordKind::Sms,
        timestamp,
        type_code,
        address: headers.get(header::ADDRESS).unwrap_or_default().to_string(),
        body: artifact.body.clone(),
        read: headers.get(header::READ) == Some("1"),
        protocol: headers.get(header::PROTOCOL).map(str::to_string),
        service_center: headers.get(header::SERVICE_CENTER).map(str::to_string),
        status: headers.get(header::STATUS).map(str::to_string),
        duration: None,
        thread_id: None,
        contact_id: None,
    })
}

/// Determines the record kind an artifact claims to carry.
///
/// Under the current scheme the datatype discriminator header is
/// authoritative; an unknown discriminator yields `None`. Artifacts lacking
/// the discriminator are parsed under the legacy scheme, where the type
/// header carrying the string `"mms"` marks a multimedia message and
/// anything else is a text message.
#[must_use]
pub fn detect_kind(headers: &Headers) -> Option<RecordKind> {
    match headers.get(header::DATATYPE) {
        Some(datatype) => RecordKind::parse(datatype),
        None => match headers.get(header::TYPE) {
            Some(type_header) if type_header.eq_ignore_ascii_case("mms") => Some(RecordKind::Mms),
            _ => Some(RecordKind::Sms),
        },
    }
}

/// Whether the artifact's body carries the encryption marker.
#[must_use]
pub fn is_encrypted(headers: &Headers) -> bool {
    headers
        .get(header::ENCRYPTED)
        .is_some_and(|v| !v.eq_ignore_ascii_case("none"))
}

/// Formats a call duration as `HH:MM:SS`.
#[must_use]
pub fn format_duration(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}

/// Body text of a call-log message: counterpart, call type, and duration
/// (omitted for missed calls).
#[must_use]
pub fn call_log_body(record: &Record) -> String {
    let label = CallType::from_code(record.type_code).map_or("unknown", CallType::label);
    let mut body = format!("{} ({} call)", record.address, label);
    if CallType::from_code(record.type_code) != Some(CallType::Missed) {
        if let Some(duration) = record.duration {
            body.push('\n');
            body.push_str("duration: ");
            body.push_str(&format_duration(duration));
        }
    }
    body
}

fn is_outbound(record: &Record) -> bool {
    match record.kind {
        RecordKind::Sms | RecordKind::Mms => record.type_code == MESSAGE_TYPE_SENT,
        RecordKind::CallLog => CallType::from_code(record.type_code) == Some(CallType::Outgoing),
    }
}

fn subject_for(record: &Record, kind: RecordKind) -> String {
    match kind {
        RecordKind::Sms | RecordKind::Mms => format!("SMS with {}", record.address),
        RecordKind::CallLog => format!("Call with {}", record.address),
    }
}

fn rfc2822_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp)
        .unwrap_or_default()
        .to_rfc2822()
}

fn parse_header<T: std::str::FromStr>(
    headers: &Headers,
    name: &'static str,
) -> Result<T, ConvertError> {
    let value = headers.get(name).ok_or(ConvertError::MissingHeader(name))?;
    value.parse().map_err(|_| ConvertError::InvalidHeader {
        name,
        value: value.to_string(),
    })
}
