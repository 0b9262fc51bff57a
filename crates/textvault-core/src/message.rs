//! Mail-message artifacts: the wire/storage form of records.

/// Names of the custom headers carried on every message artifact.
///
/// The current scheme always sets [`header::DATATYPE`]. A legacy scheme from
/// pre-existing deployments omits it and repurposes [`header::TYPE`] to also
/// carry the string `"mms"`; both schemes must be accepted on restore.
pub mod header {
    /// Counterpart address or phone number.
    pub const ADDRESS: &str = "X-textvault-address";
    /// Direction/type code; under the legacy scheme may hold `"mms"`.
    pub const TYPE: &str = "X-textvault-type";
    /// Protocol identifier.
    pub const PROTOCOL: &str = "X-textvault-protocol";
    /// Service center address.
    pub const SERVICE_CENTER: &str = "X-textvault-service-center";
    /// Record timestamp as epoch milliseconds.
    pub const DATE: &str = "X-textvault-date";
    /// Delivery status.
    pub const STATUS: &str = "X-textvault-status";
    /// Read flag, `"1"` or `"0"`.
    pub const READ: &str = "X-textvault-read";
    /// Record-kind discriminator (see [`crate::RecordKind::as_str`]).
    pub const DATATYPE: &str = "X-textvault-datatype";
    /// Body-encryption marker; absent or `"none"` for plain bodies.
    pub const ENCRYPTED: &str = "X-textvault-encrypted";
}

/// Ordered set of message headers with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any existing value of the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Returns the value of a header, if set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The mail-message representation of a record: a named header set plus a
/// body. The headers fully determine how to reconstruct the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageArtifact {
    /// Message headers.
    pub headers: Headers,
    /// Message body.
    pub body: String,
}

impl MessageArtifact {
    /// Creates an artifact from parts.
    #[must_use]
    pub fn new(headers: Headers, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }
}
