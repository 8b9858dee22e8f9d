//! Mark registry.
//!
//! Owns the canonical set of start/end marks placed on a recording. Times are
//! quantized to 0.01 s and stored as integer ticks, so two marks of the same
//! kind collide exactly when they land on the same tick.

mod file;

pub use file::{MarkEntry, load_marks_file, read_marks_into};

use crate::constants::marks::{MAX_OFFSET, TICKS_PER_SECOND};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque mark handle, displayed as `mark_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u64);

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mark_{}", self.0)
    }
}

impl Serialize for MarkId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether a mark opens or closes a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    /// Opens a segment.
    Start,
    /// Closes a segment.
    End,
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

impl std::str::FromStr for MarkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start" | "s" => Ok(Self::Start),
            "end" | "e" => Ok(Self::End),
            _ => Err(format!("unknown mark type: {s}")),
        }
    }
}

/// Read-only snapshot of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mark {
    /// Handle of the mark inside its registry.
    pub id: MarkId,
    /// Start or end.
    #[serde(rename = "type")]
    pub kind: MarkKind,
    /// Quantized position in seconds.
    pub time: f64,
}

/// Why a registry mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MarkRejection {
    /// A mark of the same kind already occupies the slot.
    #[error("a mark of the same type already exists at this position")]
    Collision,
    /// Requested time is below zero.
    #[error("mark time must not be negative")]
    NegativeTime,
    /// Requested time is NaN or infinite.
    #[error("mark time must be a finite number")]
    InvalidTime,
    /// No mark with this id exists.
    #[error("no such mark")]
    NotFound,
    /// Every slot within the search window is taken.
    #[error("no free position within {MAX_OFFSET}s of the requested time")]
    NoFreeSlot,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: MarkId,
    kind: MarkKind,
    tick: i64,
}

impl Entry {
    #[allow(clippy::cast_precision_loss)]
    fn snapshot(self) -> Mark {
        Mark {
            id: self.id,
            kind: self.kind,
            time: self.tick as f64 / TICKS_PER_SECOND,
        }
    }
}

/// Round seconds to the nearest tick.
///
/// `f64::round` rounds half away from zero.
#[allow(clippy::cast_possible_truncation)]
fn to_tick(time: f64) -> std::result::Result<i64, MarkRejection> {
    if !time.is_finite() {
        return Err(MarkRejection::InvalidTime);
    }
    if time < 0.0 {
        return Err(MarkRejection::NegativeTime);
    }
    Ok((time * TICKS_PER_SECOND).round() as i64)
}

/// Quantize a time in seconds to the nearest multiple of
/// [`STEP`](crate::constants::marks::STEP).
pub fn normalize_time(time: f64) -> f64 {
    (time * TICKS_PER_SECOND).round() / TICKS_PER_SECOND
}

/// Canonical, collision-free set of marks.
#[derive(Debug, Default, Clone)]
pub struct MarkRegistry {
    entries: Vec<Entry>,
    counter: u64,
}

impl MarkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mark at `time`, quantized to the nearest step.
    ///
    /// Never overwrites: a same-kind mark on the quantized slot rejects the
    /// call with [`MarkRejection::Collision`].
    pub fn add_mark(
        &mut self,
        kind: MarkKind,
        time: f64,
    ) -> std::result::Result<Mark, MarkRejection> {
        let tick = to_tick(time)?;
        if self.is_occupied(kind, tick, None) {
            return Err(MarkRejection::Collision);
        }

        self.counter += 1;
        let entry = Entry {
            id: MarkId(self.counter),
            kind,
            tick,
        };
        self.entries.push(entry);
        Ok(entry.snapshot())
    }

    /// Move a mark to `new_time`.
    ///
    /// When the quantized slot is taken by another mark of the same kind, the
    /// nearest free slot is searched first forward up to [`MAX_OFFSET`], then
    /// backward down to `max(0, new_time - MAX_OFFSET)`. On rejection the mark
    /// keeps its previous time.
    pub fn update_mark_time(
        &mut self,
        id: MarkId,
        new_time: f64,
    ) -> std::result::Result<Mark, MarkRejection> {
        let tick = to_tick(new_time)?;
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(MarkRejection::NotFound)?;
        let kind = self.entries[pos].kind;

        let target = self
            .find_free_tick(kind, tick, id)
            .ok_or(MarkRejection::NoFreeSlot)?;
        self.entries[pos].tick = target;
        Ok(self.entries[pos].snapshot())
    }

    /// Remove a mark. Returns `false` if the id is unknown.
    pub fn remove_mark(&mut self, id: MarkId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Remove every mark and reset id allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.counter = 0;
    }

    /// Snapshot of all marks ordered by time, then start before end, then id.
    pub fn list_marks(&self) -> Vec<Mark> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| (e.tick, e.kind, e.id));
        entries.into_iter().map(Entry::snapshot).collect()
    }

    /// Look up a single mark.
    pub fn get(&self, id: MarkId) -> Option<Mark> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.snapshot())
    }

    /// Number of marks held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no marks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_occupied(&self, kind: MarkKind, tick: i64, except: Option<MarkId>) -> bool {
        self.entries
            .iter()
            .any(|e| e.kind == kind && e.tick == tick && Some(e.id) != except)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn find_free_tick(&self, kind: MarkKind, tick: i64, id: MarkId) -> Option<i64> {
        if !self.is_occupied(kind, tick, Some(id)) {
            return Some(tick);
        }

        let max_steps = (MAX_OFFSET * TICKS_PER_SECOND).round() as i64;

        let forward = (1..=max_steps).map(|step| tick + step);
        let floor = (tick - max_steps).max(0);
        let backward = (1..=max_steps)
            .map(|step| tick - step)
            .take_while(|t| *t >= floor);

        forward
            .chain(backward)
            .find(|t| !self.is_occupied(kind, *t, Some(id)))
    }
}
