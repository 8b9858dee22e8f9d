//! Audio format probing and classification.

mod ffprobe;

pub use ffprobe::{parse_ffprobe_output, probe_with_ffprobe};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Container and codec details of a source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFormatInfo {
    /// Container name as reported by the probe (e.g. `mp3`, `mov,mp4,m4a,3gp,3g2,mj2`).
    pub container_name: String,
    /// Codec of the first audio stream (e.g. `mp3`, `aac`).
    pub codec_name: String,
    /// Sample rate in Hz, 0 when unknown.
    pub sample_rate: u32,
    /// Bit rate in bits per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    /// Total duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Channel count of the first audio stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
}

impl AudioFormatInfo {
    /// Whether the container or codec explicitly says MP3.
    pub fn is_mp3(&self) -> bool {
        self.container_name.eq_ignore_ascii_case("mp3")
            || self.codec_name.eq_ignore_ascii_case("mp3")
    }

    /// Map the source onto an export target format.
    ///
    /// Only explicit MP3 maps to [`OutputFormat::Mp3`]; AAC or an MP4-family
    /// container maps to [`OutputFormat::M4a`].
    pub fn classify(&self, path: &Path) -> Result<OutputFormat> {
        if self.is_mp3() {
            return Ok(OutputFormat::Mp3);
        }

        let container = self.container_name.to_ascii_lowercase();
        let mp4_family = ["mp4", "mov", "m4a"]
            .iter()
            .any(|name| container.split(',').any(|part| part == *name));

        if self.codec_name.eq_ignore_ascii_case("aac") || mp4_family {
            return Ok(OutputFormat::M4a);
        }

        Err(Error::FormatDetection {
            path: path.to_path_buf(),
            reason: format!(
                "unsupported container '{}' with codec '{}'",
                self.container_name, self.codec_name
            ),
        })
    }
}

/// Export target format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// MPEG-1 Layer III.
    Mp3,
    /// AAC in an MPEG-4 audio container.
    M4a,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "m4a" | "aac" | "mp4" => Ok(Self::M4a),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn info(container: &str, codec: &str) -> AudioFormatInfo {
        AudioFormatInfo {
            container_name: container.to_string(),
            codec_name: codec.to_string(),
            sample_rate: 44_100,
            bit_rate: None,
            duration: None,
            channels: None,
        }
    }

    #[test]
    fn test_classify_mp3() {
        let path = Path::new("a.mp3");
        assert_eq!(info("mp3", "mp3").classify(path).unwrap(), OutputFormat::Mp3);
        // MP3 inside an MP4 container is still MP3.
        assert_eq!(
            info("mov,mp4,m4a,3gp,3g2,mj2", "mp3")
                .classify(path)
                .unwrap(),
            OutputFormat::Mp3
        );
    }

    #[test]
    fn test_classify_m4a() {
        let path = Path::new("a.m4a");
        assert_eq!(
            info("mov,mp4,m4a,3gp,3g2,mj2", "aac")
                .classify(path)
                .unwrap(),
            OutputFormat::M4a
        );
        assert_eq!(info("aac", "aac").classify(path).unwrap(), OutputFormat::M4a);
        assert_eq!(
            info("mov,mp4,m4a,3gp,3g2,mj2", "alac")
                .classify(path)
                .unwrap(),
            OutputFormat::M4a
        );
    }

    #[test]
    fn test_classify_unknown() {
        let result = info("ogg", "vorbis").classify(Path::new("a.ogg"));
        assert!(matches!(result, Err(Error::FormatDetection { .. })));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("MP3".parse::<OutputFormat>().ok(), Some(OutputFormat::Mp3));
        assert_eq!("m4a".parse::<OutputFormat>().ok(), Some(OutputFormat::M4a));
        assert!("wav".parse::<OutputFormat>().is_err());
    }
}
