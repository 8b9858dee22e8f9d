//! JSON envelope types for CLI output.
//!
//! Every structured line marksplit prints is wrapped in a [`JsonEnvelope`],
//! so a frontend driving the CLI can dispatch on `event` alone.

use crate::automark::AutomarkReport;
use crate::config::Config;
use crate::error::Error;
use crate::marks::Mark;
use crate::probe::{AudioFormatInfo, OutputFormat};
use crate::segments::Segment;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Version of the JSON envelope format.
pub const SPEC_VERSION: &str = "1.0";

/// JSON envelope wrapping all CLI output events.
#[derive(Debug, Serialize)]
pub struct JsonEnvelope<T> {
    /// Envelope format version.
    pub spec_version: String,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event type.
    pub event: EventType,
    /// Event-specific payload.
    pub payload: T,
}

impl<T: Serialize> JsonEnvelope<T> {
    /// Create a new envelope with the current timestamp.
    pub fn new(event: EventType, payload: T) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            timestamp: Utc::now(),
            event,
            payload,
        }
    }
}

/// Event types for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Source probed, cutting begins.
    ExportStarted,
    /// Periodic progress update.
    Progress,
    /// One segment file written.
    SegmentCompleted,
    /// Final result.
    Result,
    /// Error occurred.
    Error,
    /// Operation cancelled.
    Cancelled,
}

/// Result type discriminator for result payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Files written by an export.
    Export,
    /// Derived segments (dry run).
    Segments,
    /// Probed format information.
    Probe,
    /// Automatically placed marks.
    Automark,
    /// Configuration display.
    Config,
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// The operation cannot continue.
    Fatal,
    /// The operation continues with issues.
    Warning,
}

/// Error payload for error events.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Error code (`snake_case` identifier).
    pub code: String,
    /// Error severity.
    pub severity: ErrorSeverity,
    /// Human-readable error message.
    pub message: String,
    /// Suggested action to resolve the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorPayload {
    /// Fatal payload describing `error`.
    pub fn from_error(error: &Error) -> Self {
        Self {
            code: error.code().to_string(),
            severity: ErrorSeverity::Fatal,
            message: error.to_string(),
            suggestion: error.suggestion().map(ToString::to_string),
        }
    }
}

/// Payload for `export_started`.
#[derive(Debug, Clone, Serialize)]
pub struct ExportStartedPayload {
    /// Source recording.
    pub source: PathBuf,
    /// Number of segments to write.
    pub total_segments: usize,
    /// Detected source format.
    pub source_format: OutputFormat,
    /// Format being written.
    pub target_format: OutputFormat,
    /// Whether frames are copied instead of re-encoded.
    pub stream_copy: bool,
}

/// Payload for `segment_completed`.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentCompletedPayload {
    /// 1-based segment index.
    pub index: usize,
    /// Number of segments in the run.
    pub total_segments: usize,
    /// Written file.
    pub path: PathBuf,
}

/// Why an operation was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// User pressed Ctrl+C or requested cancellation.
    UserRequest,
}

/// Payload for `cancelled`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelledPayload {
    /// Why the operation stopped.
    pub reason: CancelReason,
    /// Segments written before cancellation (all since removed).
    pub segments_completed: usize,
    /// Segments in the run.
    pub segments_total: usize,
}

/// Result payload of `split`.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResultPayload {
    /// Result discriminator.
    pub result_type: ResultType,
    /// Source recording.
    pub source: PathBuf,
    /// Written files in segment order.
    pub files: Vec<PathBuf>,
}

/// Result payload of `segments`.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentsResultPayload {
    /// Result discriminator.
    pub result_type: ResultType,
    /// Audio duration used for derivation, in seconds.
    pub duration: f64,
    /// Marks held by the registry.
    pub marks: Vec<Mark>,
    /// Derived segments.
    pub segments: Vec<Segment>,
}

/// Result payload of `probe`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResultPayload {
    /// Result discriminator.
    pub result_type: ResultType,
    /// Probed file.
    pub path: PathBuf,
    /// Format details.
    pub format: AudioFormatInfo,
    /// Export format the file maps to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_format: Option<OutputFormat>,
}

/// Result payload of `automark`.
#[derive(Debug, Clone, Serialize)]
pub struct AutomarkResultPayload {
    /// Result discriminator.
    pub result_type: ResultType,
    /// Analysed recording.
    pub source: PathBuf,
    /// Detection report.
    pub report: AutomarkReport,
    /// Marks placed.
    pub marks: Vec<Mark>,
    /// Segments those marks produce.
    pub segments: Vec<Segment>,
}

/// Result payload of `config show`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResultPayload {
    /// Result discriminator.
    pub result_type: ResultType,
    /// Config file location.
    pub path: PathBuf,
    /// Effective configuration.
    pub config: Config,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let envelope = JsonEnvelope::new(
            EventType::SegmentCompleted,
            SegmentCompletedPayload {
                index: 2,
                total_segments: 3,
                path: PathBuf::from("/rec/talk002.mp3"),
            },
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["spec_version"], SPEC_VERSION);
        assert_eq!(json["event"], "segment_completed");
        assert_eq!(json["payload"]["index"], 2);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_error_payload_skips_missing_suggestion() {
        let payload = ErrorPayload {
            code: "tool_not_found".to_string(),
            severity: ErrorSeverity::Fatal,
            message: "required tool 'ffmpeg' was not found".to_string(),
            suggestion: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(json.contains("\"severity\":\"fatal\""));
    }

    #[test]
    fn test_error_payload_from_error() {
        let payload = ErrorPayload::from_error(&Error::NoValidSegments);
        assert_eq!(payload.code, "no_valid_segments");
        assert_eq!(payload.severity, ErrorSeverity::Fatal);
        assert!(payload.suggestion.is_some());
    }

    #[test]
    fn test_probe_result_payload() {
        let payload = ProbeResultPayload {
            result_type: ResultType::Probe,
            path: PathBuf::from("a.m4a"),
            format: AudioFormatInfo {
                container_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                codec_name: "aac".to_string(),
                sample_rate: 48_000,
                bit_rate: Some(128_000),
                duration: Some(12.0),
                channels: Some(2),
            },
            export_format: Some(OutputFormat::M4a),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["result_type"], "probe");
        assert_eq!(json["format"]["codecName"], "aac");
        assert_eq!(json["export_format"], "m4a");
    }
}
