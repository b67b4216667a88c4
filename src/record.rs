//! Inbound log records
//!
//! Records are produced elsewhere and delivered to a sink through a channel.
//! The sink only reads them.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// The entity (container, process, ...) a record originated from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Display name of the entity
    pub name: String,

    /// Free-form label mapping
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A single log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the record was emitted, with its original offset
    pub time: DateTime<FixedOffset>,

    /// Stream tag, e.g. "stdout" or "stderr"
    pub source: String,

    /// Originating entity
    #[serde(default)]
    pub container: Container,

    /// Payload. Plain text, or an encoded JSON value when the sink renders
    /// structured data.
    pub data: String,
}

impl LogRecord {
    /// Create a record stamped with the current time
    pub fn new(
        container: Container,
        source: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            time: Utc::now().into(),
            source: source.into(),
            container,
            data: data.into(),
        }
    }
}

/// Sender half of the record channel
pub type RecordSender = mpsc::Sender<LogRecord>;

/// Receiver half of the record channel
pub type RecordReceiver = mpsc::Receiver<LogRecord>;

/// Default number of records buffered between a producer and a sink
pub const DEFAULT_CHANNEL_BUFFER: usize = 1024;

/// Create a bounded channel for delivering records to a sink
pub fn create_channel(buffer: usize) -> (RecordSender, RecordReceiver) {
    mpsc::channel(buffer)
}
