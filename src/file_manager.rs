//! Active log file management
//!
//! Owns the single open handle for `directory/filename` and performs the
//! create, rename and existence-check steps of rotation.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::{Result, SinkError};
use crate::rotation::rotated_file_name;

/// Manages the active log file of one sink
#[derive(Debug)]
pub struct FileManager {
    /// Directory holding the active file and its rotated copies
    directory: PathBuf,
    /// Base filename of the active file
    filename: String,
    /// Full path of the active file
    path: PathBuf,
    /// Open handle, if any
    file: Option<File>,
    /// Bytes written to the active file since it was created
    size: u64,
    /// Stat the active file in `ensure_open` and recreate it if missing
    check_exists: bool,
}

impl FileManager {
    /// Create a manager without touching the filesystem
    pub fn new(directory: impl Into<PathBuf>, filename: impl Into<String>, check_exists: bool) -> Self {
        let directory = directory.into();
        let filename = filename.into();
        let path = directory.join(&filename);
        Self {
            directory,
            filename,
            path,
            file: None,
            size: 0,
            check_exists,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Path of the active file; never changes across rotations
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the active file since it was created
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Make sure there is an open handle backed by a file on disk
    ///
    /// Creates the file fresh when no handle is open, or when existence
    /// checks are enabled and the file was removed out of band. Without the
    /// check, writes keep going to the unlinked inode.
    ///
    /// Returns `true` if a new file was created.
    pub fn ensure_open(&mut self) -> Result<bool> {
        let missing = self.check_exists && !self.path.exists();
        if self.file.is_some() && !missing {
            return Ok(false);
        }

        if missing {
            tracing::warn!(path = %self.path.display(), "Log file disappeared, recreating");
        }
        self.create()?;
        Ok(true)
    }

    /// Append bytes to the active file
    ///
    /// Does not rotate; the caller decides based on [`FileManager::size`].
    /// The byte count only advances when the whole buffer was written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| SinkError::NotOpen(self.path.clone()))?;

        file.write_all(buf)
            .map_err(|e| SinkError::io("write", &self.path, e))?;

        self.size += buf.len() as u64;
        Ok(buf.len())
    }

    /// Close the active file, move it aside with a timestamp suffix and
    /// create a fresh one at the same path
    ///
    /// Steps run in order and the first failure aborts the rest. The handle is
    /// released even if closing reports an error.
    ///
    /// Returns the path the previous file was renamed to, if there was one.
    pub fn rotate(&mut self) -> Result<Option<PathBuf>> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|e| SinkError::io("close", &self.path, e))?;
        }

        let rotated = if self.path.exists() {
            let target = self.rotation_target();
            fs::rename(&self.path, &target).map_err(|e| SinkError::io("rename", &self.path, e))?;
            tracing::info!(
                from = %self.path.display(),
                to = %target.display(),
                "Renamed existing log file"
            );
            Some(target)
        } else {
            None
        };

        self.create()?;
        Ok(rotated)
    }

    /// Pick a name for the rotated file that does not clobber an older one
    fn rotation_target(&self) -> PathBuf {
        let now = Local::now();
        let target = self
            .directory
            .join(rotated_file_name(&self.filename, &now, false));
        if target.exists() {
            self.directory
                .join(rotated_file_name(&self.filename, &now, true))
        } else {
            target
        }
    }

    /// Create (or truncate) the active file and reset the byte count
    fn create(&mut self) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| SinkError::io("create", &self.path, e))?;
        tracing::info!(path = %self.path.display(), "Created new log file");
        self.file = Some(file);
        self.size = 0;
        Ok(())
    }
}
