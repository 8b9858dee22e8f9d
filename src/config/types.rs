//! Configuration type definitions.

use crate::constants::automark::{
    DEFAULT_MIN_SILENCE, DEFAULT_MIN_SOUND, DEFAULT_MIN_VALID_RATIO, DEFAULT_THRESHOLD,
    DEFAULT_WINDOW_MS,
};
use crate::constants::export::{DEFAULT_AAC_BITRATE, DEFAULT_MP3_BITRATE};
use crate::constants::tools::{FFMPEG, FFPROBE};
use crate::export::ExportSettings;
use crate::segments::{SegmentPolicy, Strictness};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations.
    pub tools: ToolsConfig,

    /// Segment derivation settings.
    pub segments: SegmentsConfig,

    /// Export settings.
    pub export: ExportConfig,

    /// Automatic marking settings.
    pub automark: AutomarkSettings,
}

/// External tool locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// ffmpeg executable (name on `PATH` or absolute path).
    pub ffmpeg: String,

    /// ffprobe executable (name on `PATH` or absolute path).
    pub ffprobe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: FFMPEG.to_string(),
            ffprobe: FFPROBE.to_string(),
        }
    }
}

/// Segment derivation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentsConfig {
    /// Strict (1 s) or relaxed (0.1 s) minimum duration.
    pub strictness: Strictness,

    /// Explicit minimum duration in seconds, overriding `strictness`.
    pub min_duration: Option<f64>,
}

impl SegmentsConfig {
    /// Policy described by this section.
    pub fn policy(&self) -> SegmentPolicy {
        let policy = SegmentPolicy::new(self.strictness);
        match self.min_duration {
            Some(min) => policy.with_min_duration(min),
            None => policy,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// MP3 bitrate used when the source bit rate is unknown.
    pub mp3_bitrate: String,

    /// AAC bitrate used when the source bit rate is unknown.
    pub aac_bitrate: String,

    /// Directory for exported files. Defaults to the source's directory.
    pub output_dir: Option<PathBuf>,

    /// Kill a segment's transcoder after this many seconds.
    pub segment_timeout_secs: Option<u64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mp3_bitrate: DEFAULT_MP3_BITRATE.to_string(),
            aac_bitrate: DEFAULT_AAC_BITRATE.to_string(),
            output_dir: None,
            segment_timeout_secs: None,
        }
    }
}

impl ExportConfig {
    /// Pipeline settings described by this section.
    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            mp3_bitrate: self.mp3_bitrate.clone(),
            aac_bitrate: self.aac_bitrate.clone(),
            segment_timeout: self.segment_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Silence detection thresholds for automatic marking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomarkSettings {
    /// Peak amplitude (0.0-1.0) above which a window counts as sound.
    pub threshold: f32,

    /// Analysis window length in milliseconds.
    pub window_ms: u32,

    /// Silence shorter than this many seconds does not end a region.
    pub min_silence: f64,

    /// Regions shorter than this many seconds are dropped.
    pub min_sound: f64,

    /// Minimum fraction of loud windows inside a kept region.
    pub min_valid_ratio: f32,
}

impl Default for AutomarkSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            window_ms: DEFAULT_WINDOW_MS,
            min_silence: DEFAULT_MIN_SILENCE,
            min_sound: DEFAULT_MIN_SOUND,
            min_valid_ratio: DEFAULT_MIN_VALID_RATIO,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_policy_override() {
        let config = SegmentsConfig {
            strictness: Strictness::Relaxed,
            min_duration: None,
        };
        assert_eq!(config.policy().min_duration, 0.1);

        let config = SegmentsConfig {
            strictness: Strictness::Relaxed,
            min_duration: Some(2.5),
        };
        assert_eq!(config.policy().min_duration, 2.5);
    }

    #[test]
    fn test_export_settings_from_config() {
        let config = ExportConfig {
            segment_timeout_secs: Some(30),
            ..ExportConfig::default()
        };
        let settings = config.settings();
        assert_eq!(settings.segment_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.mp3_bitrate, "192k");
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[tools]"));
        assert!(text.contains("[automark]"));
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.tools.ffmpeg, "ffmpeg");
        assert_eq!(parsed.automark, AutomarkSettings::default());
    }
}
