//! Sink configuration
//!
//! A sink is described by a route: an address (the base filename) plus a map
//! of string options. The route form looks like
//! `file://sample.log?maxfilesize=102400&maxfilecount=5`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SinkError};
use crate::render::RenderShape;

/// Directory log files are written to
pub const DEFAULT_LOG_DIR: &str = "/var/log/";

/// Base filename used when the route address is empty
pub const DEFAULT_FILENAME: &str = "default.log";

/// Default size threshold (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Environment variable that enables the existence check before each write
pub const CHECK_LOG_FILE_ENV: &str = "CHECK_LOG_FILE";

const ROUTE_SCHEME: &str = "file";

/// A resolved route descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// Base filename for the sink
    pub address: String,
    /// Raw option values keyed by option name
    pub options: HashMap<String, String>,
}

impl Route {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            options: HashMap::new(),
        }
    }

    /// Add an option, builder style
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Get an option value
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Parse a `file://<address>?<key>=<value>&...` route
    pub fn parse(route: &str) -> Result<Self> {
        let invalid = |reason: &str| SinkError::InvalidRoute {
            route: route.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = route
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if scheme != ROUTE_SCHEME {
            return Err(invalid("unsupported scheme, expected 'file'"));
        }

        let (address, query) = match rest.split_once('?') {
            Some((address, query)) => (address, Some(query)),
            None => (rest, None),
        };
        if address.contains('/') {
            return Err(invalid("address must be a bare filename"));
        }

        let mut parsed = Route::new(address);
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if key.is_empty() {
                return Err(invalid("option with empty name"));
            }
            parsed.options.insert(key.to_string(), value.to_string());
        }

        Ok(parsed)
    }
}

/// Resolved configuration for one sink instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Directory holding the active and rotated files
    pub directory: PathBuf,
    /// Base filename of the active file
    pub filename: String,
    /// Rotate once the active file grows past this many bytes
    pub max_file_size: u64,
    /// Keep at most this many matching files; `None` keeps everything
    pub max_file_count: Option<usize>,
    /// Output shape for the payload
    pub shape: RenderShape,
    /// Stat the active file before every write and recreate it if missing
    pub check_file_exists: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            filename: DEFAULT_FILENAME.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: None,
            shape: RenderShape::default(),
            check_file_exists: false,
        }
    }
}

impl SinkConfig {
    /// Build a config from a route, reading the existence-check toggle from
    /// the environment
    pub fn from_route(route: &Route) -> Self {
        let check = std::env::var(CHECK_LOG_FILE_ENV)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        Self::from_route_with_check(route, check)
    }

    /// Build a config from a route with an explicit existence-check setting
    pub fn from_route_with_check(route: &Route, check_file_exists: bool) -> Self {
        let defaults = Self::default();

        let filename = if route.address.is_empty() {
            defaults.filename
        } else {
            route.address.clone()
        };

        let max_file_size = route
            .option("maxfilesize")
            .and_then(parse_positive::<u64>)
            .unwrap_or(defaults.max_file_size);

        let max_file_count = route.option("maxfilecount").and_then(parse_positive::<usize>);

        Self {
            directory: defaults.directory,
            filename,
            max_file_size,
            max_file_count,
            shape: RenderShape::from_option(route.option("structured_data")),
            check_file_exists,
        }
    }

    /// Use a different directory
    pub fn with_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = directory.as_ref().to_path_buf();
        self
    }

    /// Path of the active file
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Parse a strictly positive integer, ignoring anything else
fn parse_positive<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Some(n),
        Ok(_) => {
            tracing::debug!(value, "Ignoring non-positive option value");
            None
        }
        Err(_) => {
            tracing::debug!(value, "Ignoring unparseable option value");
            None
        }
    }
}
