//! Segment export pipeline.
//!
//! Drives the transcoding engine once per segment, strictly one process at a
//! time, and reports progress over a channel. A run ends `Completed`,
//! `Cancelled` or `Failed`; the last two remove every file the run wrote.

mod pipeline;
mod progress;
mod strategy;

pub use crate::engine::CutStrategy;
pub use pipeline::{ExportHandle, ExportPipeline, check_source};
pub use progress::{ProgressAggregator, ProgressEvent};
pub use strategy::{align_to_frame, cut_points, output_path, select_strategy};

use crate::constants::export::{DEFAULT_AAC_BITRATE, DEFAULT_MP3_BITRATE};
use crate::error::Error;
use crate::probe::{AudioFormatInfo, OutputFormat};
use crate::segments::Segment;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// MP3 bitrate when the source bit rate is unknown.
    pub mp3_bitrate: String,
    /// AAC bitrate when the source bit rate is unknown.
    pub aac_bitrate: String,
    /// Kill a segment's process if it runs longer than this.
    pub segment_timeout: Option<Duration>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            mp3_bitrate: DEFAULT_MP3_BITRATE.to_string(),
            aac_bitrate: DEFAULT_AAC_BITRATE.to_string(),
            segment_timeout: None,
        }
    }
}

/// What to export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Source recording.
    pub source: PathBuf,
    /// Segments to cut, in order.
    pub segments: Vec<Segment>,
    /// Target format; defaults to the detected source format.
    pub target: Option<OutputFormat>,
    /// Directory for outputs; defaults to the source's directory.
    pub output_dir: Option<PathBuf>,
    /// Format info the caller already probed. The run probes the source
    /// itself when this is `None`.
    pub probed: Option<AudioFormatInfo>,
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "segment")]
pub enum ExportState {
    /// Created, not yet started.
    Idle,
    /// Inspecting the source.
    Probing,
    /// Cutting segment `n` (1-based).
    ExportingSegment(usize),
    /// All segments written.
    Completed,
    /// Stopped on request.
    Cancelled,
    /// Stopped by an error.
    Failed,
}

impl ExportState {
    /// Whether the run is over.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Probing => write!(f, "probing"),
            Self::ExportingSegment(n) => write!(f, "exporting segment {n}"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ExportEvent {
    /// Probing finished and cutting is about to begin.
    Started {
        /// Number of segments.
        total_segments: usize,
        /// Detected source format.
        source_format: OutputFormat,
        /// Format being written.
        target_format: OutputFormat,
        /// Whether frames are copied instead of re-encoded.
        stream_copy: bool,
    },
    /// Progress update.
    Progress(ProgressEvent),
    /// A segment file was written.
    SegmentCompleted {
        /// 1-based segment index.
        index: usize,
        /// Number of segments.
        total_segments: usize,
        /// Written file.
        path: PathBuf,
    },
}

/// Terminal result of a run.
#[derive(Debug)]
pub enum ExportOutcome {
    /// Every segment was written.
    Completed {
        /// Written files in segment order.
        files: Vec<PathBuf>,
    },
    /// The run was cancelled and its files removed.
    Cancelled,
    /// The run failed and its files removed.
    Failed {
        /// What went wrong.
        error: Error,
    },
}

impl ExportOutcome {
    /// Terminal state matching this outcome.
    pub const fn state(&self) -> ExportState {
        match self {
            Self::Completed { .. } => ExportState::Completed,
            Self::Cancelled => ExportState::Cancelled,
            Self::Failed { .. } => ExportState::Failed,
        }
    }
}
