//! Error types for the file sink

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the file sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// A filesystem operation failed
    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        /// Operation that failed (e.g. "create", "rename")
        op: &'static str,
        /// Path the operation targeted
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write was attempted with no open file handle
    #[error("no open log file at {}", .0.display())]
    NotOpen(PathBuf),

    /// The route descriptor could not be understood
    #[error("invalid route '{route}': {reason}")]
    InvalidRoute { route: String, reason: String },
}

impl SinkError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        SinkError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message_includes_path() {
        let err = SinkError::io(
            "rename",
            "/var/log/app.log",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("rename"));
        assert!(msg.contains("/var/log/app.log"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_invalid_route_message() {
        let err = SinkError::InvalidRoute {
            route: "tcp://x".to_string(),
            reason: "unsupported scheme".to_string(),
        };
        assert_eq!(err.to_string(), "invalid route 'tcp://x': unsupported scheme");
    }
}
