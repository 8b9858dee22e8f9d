//! Transcoding engine seam.
//!
//! The export pipeline never runs a transcoder directly. It hands a
//! [`CutJob`] to a [`TranscodeEngine`] and gets back a [`RunningCut`] that
//! streams progress, resolves once the process exits, and can be killed.

mod ffmpeg;

pub use ffmpeg::{FfmpegEngine, cut_args, parse_progress_line};

use async_trait::async_trait;
use crate::error::Result;
use crate::probe::AudioFormatInfo;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

/// How a segment is extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutStrategy {
    /// Repackage existing frames without re-encoding.
    Copy,
    /// Re-encode to constant bitrate MP3.
    Mp3 {
        /// Target bitrate, e.g. `192k`.
        bitrate: String,
    },
    /// Re-encode to AAC in an M4A container.
    Aac {
        /// Target bitrate, e.g. `192k`.
        bitrate: String,
    },
}

impl CutStrategy {
    /// Whether cut points must be aligned to codec frames.
    pub const fn is_copy(&self) -> bool {
        matches!(self, Self::Copy)
    }
}

/// One time-ranged extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct CutJob {
    /// Source recording.
    pub input: PathBuf,
    /// File to create.
    pub output: PathBuf,
    /// Start offset in seconds.
    pub start: f64,
    /// Length in seconds.
    pub duration: f64,
    /// Copy or re-encode.
    pub strategy: CutStrategy,
}

/// Handle to an extraction in flight.
#[derive(Debug)]
pub struct RunningCut {
    /// Segment progress in percent (0-100). Closed when the process exits.
    pub progress: mpsc::UnboundedReceiver<f64>,
    /// Resolves once the process has exited or was killed.
    pub done: oneshot::Receiver<Result<()>>,
    /// Sending on this kills the process. Dropping it does not.
    pub kill: oneshot::Sender<()>,
}

/// External transcoder used by the export pipeline.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Name used in error messages.
    fn tool_name(&self) -> &str {
        crate::constants::tools::FFMPEG
    }

    /// Inspect the container and first audio stream of `path`.
    async fn probe(&self, path: &Path) -> Result<AudioFormatInfo>;

    /// Start extracting `job`. Must be called from within a tokio runtime.
    fn spawn_cut(&self, job: &CutJob) -> Result<RunningCut>;
}
