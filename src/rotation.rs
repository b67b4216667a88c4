//! Rotation and retention decisions
//!
//! Pure functions only; the filesystem side lives in
//! [`crate::file_manager`] and [`crate::retention`].

use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, TimeZone};

/// Whether the active file has grown past the threshold
///
/// Rotation fires only once the byte count strictly exceeds `max_size`.
pub fn should_rotate(current_size: u64, max_size: u64) -> bool {
    current_size > max_size
}

/// Name for a rotated-out file: `<basename>.<RFC3339 timestamp>`
///
/// With `precise` set, the timestamp carries nanoseconds so that several
/// rotations within the same second get distinct names.
pub fn rotated_file_name<Tz>(basename: &str, rotated_at: &DateTime<Tz>, precise: bool) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let format = if precise {
        SecondsFormat::Nanos
    } else {
        SecondsFormat::Secs
    };
    format!("{}.{}", basename, rotated_at.to_rfc3339_opts(format, true))
}

/// Whether a directory entry belongs to the sink with this basename
///
/// Substring match: covers the active file and every rotated copy.
pub fn matches_basename(file_name: &str, basename: &str) -> bool {
    file_name.contains(basename)
}

/// A file considered for pruning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneCandidate {
    pub name: String,
    pub modified: SystemTime,
    /// Whether this is the active file
    pub active: bool,
}

/// Pick the files to delete so that at most `keep_count` remain
///
/// Returned candidates are the oldest by modification time, oldest first.
/// On equal times the active file counts as newest, then names break the tie.
/// Nothing is returned when there are `keep_count` files or fewer.
pub fn select_for_pruning(
    mut candidates: Vec<PruneCandidate>,
    keep_count: usize,
) -> Vec<PruneCandidate> {
    if candidates.len() <= keep_count {
        return Vec::new();
    }

    candidates.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then(a.active.cmp(&b.active))
            .then_with(|| a.name.cmp(&b.name))
    });
    let excess = candidates.len() - keep_count;
    candidates.truncate(excess);
    candidates
}
