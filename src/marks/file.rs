//! Marks file loading.
//!
//! A marks file is a JSON array of `{"type": "start"|"end", "time": <seconds>}`
//! objects. An `id` field, as written by `marksplit segments --output json`,
//! is accepted and ignored.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use super::{MarkKind, MarkRegistry};
use crate::error::{Error, Result};

/// One entry of a marks file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MarkEntry {
    /// Start or end.
    #[serde(rename = "type")]
    pub kind: MarkKind,
    /// Position in seconds.
    pub time: f64,
}

/// Parse a marks file.
pub fn load_marks_file(path: &Path) -> Result<Vec<MarkEntry>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::MarksFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| Error::MarksFileParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Feed entries through [`MarkRegistry::add_mark`].
///
/// Rejected entries are logged and skipped. Returns the number of marks added.
pub fn read_marks_into(registry: &mut MarkRegistry, entries: &[MarkEntry]) -> usize {
    let mut added = 0;
    for entry in entries {
        match registry.add_mark(entry.kind, entry.time) {
            Ok(_) => added += 1,
            Err(reason) => warn!(
                "Skipping {} mark at {:.2}s: {reason}",
                entry.kind, entry.time
            ),
        }
    }
    added
}
