//! Error types for marksplit.

/// Result type alias for marksplit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for marksplit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Input audio file does not exist.
    #[error("input file does not exist: {path}")]
    InputNotFound {
        /// Path to the missing file.
        path: std::path::PathBuf,
    },

    /// Input audio file exists but cannot be read.
    #[error("input file is not readable: {path}")]
    InputUnreadable {
        /// Path to the unreadable file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The audio format could not be classified.
    #[error("could not detect audio format of '{path}': {reason}")]
    FormatDetection {
        /// Path to the probed file.
        path: std::path::PathBuf,
        /// Why detection failed.
        reason: String,
    },

    /// An external tool is not installed or not on `PATH`.
    #[error("required tool '{tool}' was not found")]
    ToolNotFound {
        /// Tool name.
        tool: String,
    },

    /// The transcoding engine failed.
    #[error("{tool} failed: {message}")]
    Subprocess {
        /// Tool name.
        tool: String,
        /// Engine diagnostic output.
        message: String,
    },

    /// No exportable segments remain after derivation.
    #[error("no valid segments to export")]
    NoValidSegments,

    /// An export is already running on this pipeline.
    #[error("an export is already in progress")]
    ExportInProgress,

    /// Failed to read a marks file.
    #[error("failed to read marks file '{path}'")]
    MarksFileRead {
        /// Path to the marks file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a marks file.
    #[error("failed to parse marks file '{path}'")]
    MarksFileParse {
        /// Path to the marks file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Invalid mark argument on the command line.
    #[error("invalid mark '{value}': expected start:<seconds> or end:<seconds>")]
    InvalidMarkArgument {
        /// The rejected value.
        value: String,
    },

    /// Failed to open audio file for analysis.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio for analysis.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: std::path::PathBuf,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Stable `snake_case` identifier used in structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::ConfigDirNotFound
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigValidation { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. } => "config",
            Self::InputNotFound { .. } => "input_not_found",
            Self::InputUnreadable { .. } => "input_unreadable",
            Self::FormatDetection { .. } => "format_detection_failure",
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::Subprocess { .. } => "subprocess_failure",
            Self::NoValidSegments => "no_valid_segments",
            Self::ExportInProgress => "export_in_progress",
            Self::MarksFileRead { .. } | Self::MarksFileParse { .. } => "marks_file",
            Self::InvalidMarkArgument { .. } => "invalid_mark",
            Self::AudioOpen { .. } | Self::AudioDecode { .. } | Self::NoAudioTracks { .. } => {
                "audio_decode"
            }
            Self::Internal { .. } => "internal",
        }
    }

    /// Short hint for resolving the error, if one applies.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound { .. } => {
                Some("install ffmpeg or set tools.ffmpeg and tools.ffprobe in the config file")
            }
            Self::FormatDetection { .. } => Some("only MP3 and AAC/M4A sources can be split"),
            Self::NoValidSegments => {
                Some("add start/end mark pairs at least the minimum duration apart")
            }
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => {
                Some("run 'marksplit config path' to locate the config file")
            }
            Self::InvalidMarkArgument { .. } => Some("use e.g. --mark start:12.5 --mark end:1:02"),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_subprocess_error_keeps_engine_text() {
        let err = Error::Subprocess {
            tool: "ffmpeg".to_string(),
            message: "Invalid data found when processing input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg failed: Invalid data found when processing input"
        );
        assert_eq!(err.code(), "subprocess_failure");
    }

    #[test]
    fn test_input_errors_have_distinct_codes() {
        let missing = Error::InputNotFound {
            path: PathBuf::from("a.mp3"),
        };
        let unreadable = Error::InputUnreadable {
            path: PathBuf::from("a.mp3"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_ne!(missing.code(), unreadable.code());
    }
}
