//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "marksplit";

/// Configuration file locations.
pub mod config {
    /// Environment variable naming an explicit config file.
    pub const CONFIG_ENV: &str = "MARKSPLIT_CONFIG";

    /// File name inside the platform config directory.
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Mark placement constants.
pub mod marks {
    /// Minimum time granularity in seconds.
    ///
    /// Two marks of the same type closer than this are considered the same
    /// position.
    pub const STEP: f64 = 0.01;

    /// Number of quantization ticks per second (`1 / STEP`).
    pub const TICKS_PER_SECOND: f64 = 100.0;

    /// Maximum distance in seconds a dragged mark may be moved away from the
    /// requested position to find a free slot.
    pub const MAX_OFFSET: f64 = 1.0;
}

/// Segment derivation constants.
pub mod segments {
    /// Minimum segment duration in strict mode, in seconds.
    pub const STRICT_MIN_DURATION: f64 = 1.0;

    /// Minimum segment duration in relaxed mode, in seconds.
    pub const RELAXED_MIN_DURATION: f64 = 0.1;

    /// Slack for float error when comparing spans built from 0.01 s ticks.
    pub const DURATION_EPSILON: f64 = 1e-9;

    /// Sample rate assumed for the end-of-file tolerance before the source
    /// has been probed.
    pub const DEFAULT_TOLERANCE_SAMPLE_RATE: u32 = 44_100;
}

/// Codec framing constants.
pub mod codec {
    /// Samples per MPEG-1 Layer III frame.
    pub const MP3_SAMPLES_PER_FRAME: u32 = 1152;
}

/// Export pipeline constants.
pub mod export {
    /// Width of the zero-padded index appended to output file names.
    pub const INDEX_WIDTH: usize = 3;

    /// Default constant bitrate for MP3 re-encodes when the source bitrate
    /// is unknown.
    pub const DEFAULT_MP3_BITRATE: &str = "192k";

    /// Default AAC bitrate for M4A re-encodes when the source bitrate is
    /// unknown.
    pub const DEFAULT_AAC_BITRATE: &str = "192k";

    /// Maximum number of stderr bytes kept from a failed engine run.
    pub const STDERR_TAIL_BYTES: usize = 4096;

    /// Upper bound accepted for a per-segment watchdog timeout, in seconds.
    pub const MAX_SEGMENT_TIMEOUT_SECS: u64 = 24 * 60 * 60;
}

/// External tool names.
pub mod tools {
    /// Default transcoder executable.
    pub const FFMPEG: &str = "ffmpeg";

    /// Default probe executable.
    pub const FFPROBE: &str = "ffprobe";
}

/// Silence detection defaults for automatic marking.
pub mod automark {
    /// Analysis window length in milliseconds.
    pub const DEFAULT_WINDOW_MS: u32 = 10;

    /// Peak amplitude (0.0-1.0) above which a window counts as sound.
    pub const DEFAULT_THRESHOLD: f32 = 0.02;

    /// Silence shorter than this (seconds) does not split a sound region.
    pub const DEFAULT_MIN_SILENCE: f64 = 0.5;

    /// Sound regions shorter than this (seconds) are discarded.
    pub const DEFAULT_MIN_SOUND: f64 = 1.0;

    /// Minimum fraction of loud windows inside a kept region.
    pub const DEFAULT_MIN_VALID_RATIO: f32 = 0.3;
}

/// Supported source audio file extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "mp4", "aac", "mov", "wav", "flac"];
