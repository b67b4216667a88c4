//! file-sink - persists a stream of log records to size-rotated files
//!
//! Records arrive over a channel, are rendered to one JSON line each, and are
//! appended to `directory/basename`. When the file grows past its size limit
//! it is renamed to `basename.<RFC3339 timestamp>` and a fresh file takes its
//! place. Old files can optionally be pruned down to a fixed count.

pub mod config;
pub mod error;
pub mod file_manager;
pub mod logging;
pub mod record;
pub mod render;
pub mod retention;
pub mod rotation;
pub mod sink;

pub use config::{Route, SinkConfig};
pub use error::{Result, SinkError};
pub use record::{create_channel, Container, LogRecord, RecordReceiver, RecordSender};
pub use render::{RenderShape, Renderer};
pub use sink::{FileSink, SinkStats, SinkStatus};
