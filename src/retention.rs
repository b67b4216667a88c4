//! Log file retention management
//!
//! Handles cleanup of old log files based on how many are kept.

use std::fs;
use std::path::Path;

use crate::error::{Result, SinkError};
use crate::rotation::{matches_basename, select_for_pruning, PruneCandidate};

/// Delete the oldest files belonging to `basename` so at most `keep_count` remain
///
/// Every regular file in `directory` whose name contains `basename` counts,
/// including the active file. Files that cannot be deleted are logged and
/// skipped.
///
/// Returns the number of files deleted.
pub fn prune(directory: &Path, basename: &str, keep_count: usize) -> Result<usize> {
    let entries = fs::read_dir(directory).map_err(|e| SinkError::io("list", directory, e))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %directory.display(), error = %e, "Failed to read directory entry");
                continue;
            }
        };

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !matches_basename(&name, basename) {
            continue;
        }

        // Only regular files; symlinks are not followed
        let modified = match entry.metadata() {
            Ok(metadata) if metadata.file_type().is_file() => metadata.modified(),
            Ok(_) => continue,
            Err(e) => Err(e),
        };
        match modified {
            Ok(modified) => {
                let active = name == basename;
                candidates.push(PruneCandidate {
                    name,
                    modified,
                    active,
                })
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Failed to read modification time");
            }
        }
    }

    let mut deleted_count = 0;
    for candidate in select_for_pruning(candidates, keep_count) {
        let path = directory.join(&candidate.name);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Pruned old log file");
                deleted_count += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to prune log file");
            }
        }
    }

    Ok(deleted_count)
}
