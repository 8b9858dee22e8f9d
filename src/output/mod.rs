//! Terminal and structured output.

mod json_envelope;
pub mod progress;
mod reporter;

pub use json_envelope::{
    AutomarkResultPayload, CancelReason, CancelledPayload, ConfigResultPayload, ErrorPayload,
    ErrorSeverity, EventType, ExportResultPayload, ExportStartedPayload, JsonEnvelope,
    ProbeResultPayload, ResultType, SPEC_VERSION, SegmentCompletedPayload, SegmentsResultPayload,
};
pub use reporter::{
    ExportReporter, HumanReporter, JsonProgressReporter, NullReporter, ProgressThrottler,
    create_reporter, emit_json_error, emit_json_result,
};

use serde::{Deserialize, Serialize};

/// How results and progress are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Progress bar and plain text.
    #[default]
    Human,
    /// One JSON array written when the command finishes.
    Json,
    /// One JSON object per line, streamed as events happen.
    Ndjson,
}

impl OutputMode {
    /// Whether output is machine-readable.
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json | Self::Ndjson)
    }
}
