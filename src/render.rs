//! Record rendering
//!
//! Turns a [`LogRecord`] into one newline-terminated JSON object:
//!
//! ```text
//! {"container":"web","labels":{"app":"shop"},"timestamp":"2024-01-01T12:00:00Z","source":"stdout","line":"hello"}
//! ```

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::record::LogRecord;

/// How the payload is written into the `line` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderShape {
    /// Payload is encoded as a JSON string literal
    #[default]
    Escaped,
    /// Payload is embedded verbatim; it must already be encoded JSON
    Structured,
}

impl RenderShape {
    /// Select the shape from the `structured_data` route option
    pub fn from_option(value: Option<&str>) -> Self {
        match value {
            Some("true") => RenderShape::Structured,
            _ => RenderShape::Escaped,
        }
    }
}

/// Stateless record renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    shape: RenderShape,
}

impl Renderer {
    pub fn new(shape: RenderShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> RenderShape {
        self.shape
    }

    /// Render a record into its on-disk line, newline included
    pub fn render(&self, record: &LogRecord) -> Vec<u8> {
        let mut out = String::with_capacity(128 + record.data.len());

        out.push_str("{\"container\":");
        out.push_str(&to_json_or_null(&record.container.name, "container"));
        out.push_str(",\"labels\":");
        out.push_str(&to_json_or_null(&record.container.labels, "labels"));
        out.push_str(",\"timestamp\":\"");
        out.push_str(&format_timestamp(&record.time));
        out.push_str("\",\"source\":");
        out.push_str(&to_json_or_null(&record.source, "source"));
        out.push_str(",\"line\":");
        match self.shape {
            // Nothing to embed; keep the line valid
            RenderShape::Structured if record.data.trim().is_empty() => out.push_str("null"),
            RenderShape::Structured => out.push_str(&record.data),
            RenderShape::Escaped => out.push_str(&to_json_or_null(&record.data, "line")),
        }
        out.push_str("}\n");

        out.into_bytes()
    }
}

/// Encode a field value as JSON, degrading to `null` if encoding fails
///
/// Strings and string maps always encode; the fallback covers any other
/// field type routed through here.
fn to_json_or_null<T: Serialize + ?Sized>(value: &T, name: &str) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(field = name, error = %e, "Failed to encode field as JSON, writing null");
            "null".to_string()
        }
    }
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SS` followed by `Z` for UTC or
/// `+hhmm`/`-hhmm` otherwise
pub fn format_timestamp(time: &DateTime<FixedOffset>) -> String {
    if time.offset().local_minus_utc() == 0 {
        time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        time.format("%Y-%m-%dT%H:%M:%S%z").to_string()
    }
}
