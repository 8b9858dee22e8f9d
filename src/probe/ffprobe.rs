//! FFprobe-based format probing.

use super::AudioFormatInfo;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    bit_rate: Option<String>,
    duration: Option<String>,
}

/// Probe `path` with the ffprobe executable at `ffprobe`.
pub async fn probe_with_ffprobe(ffprobe: &str, path: &Path) -> Result<AudioFormatInfo> {
    debug!("Probing {} with {ffprobe}", path.display());

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolNotFound {
                    tool: ffprobe.to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::FormatDetection {
            path: path.to_path_buf(),
            reason: if stderr.trim().is_empty() {
                format!("{ffprobe} exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            },
        });
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_ffprobe_output(path, &json)
}

/// Build an [`AudioFormatInfo`] from ffprobe's JSON output.
///
/// Uses the first audio stream.
pub fn parse_ffprobe_output(path: &Path, json: &str) -> Result<AudioFormatInfo> {
    let detection_error = |reason: String| Error::FormatDetection {
        path: path.to_path_buf(),
        reason,
    };

    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| detection_error(format!("unreadable probe output: {e}")))?;

    let format = output
        .format
        .ok_or_else(|| detection_error("probe reported no container".to_string()))?;

    let stream = output
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| detection_error("no audio stream".to_string()))?;

    let duration = format
        .duration
        .as_deref()
        .or(stream.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok());

    let bit_rate = stream
        .bit_rate
        .as_deref()
        .or(format.bit_rate.as_deref())
        .and_then(|s| s.parse::<u64>().ok());

    Ok(AudioFormatInfo {
        container_name: format.format_name,
        codec_name: stream.codec_name.unwrap_or_default(),
        sample_rate: stream
            .sample_rate
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        bit_rate,
        duration,
        channels: stream.channels,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const MP3_PROBE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "mp3",
                "codec_type": "audio",
                "sample_rate": "44100",
                "channels": 2,
                "bit_rate": "128000",
                "duration": "180.062041"
            }
        ],
        "format": {
            "filename": "talk.mp3",
            "format_name": "mp3",
            "duration": "180.062041",
            "bit_rate": "128021"
        }
    }"#;

    #[test]
    fn test_parse_mp3_probe() {
        let info = parse_ffprobe_output(Path::new("talk.mp3"), MP3_PROBE).unwrap();
        assert_eq!(info.container_name, "mp3");
        assert_eq!(info.codec_name, "mp3");
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.bit_rate, Some(128_000));
        assert_eq!(info.channels, Some(2));
        assert!((info.duration.unwrap() - 180.062_041).abs() < 1e-9);
    }

    #[test]
    fn test_parse_skips_video_stream() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "codec_name": "h264"},
                {"codec_type": "audio", "codec_name": "aac", "sample_rate": "48000"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "12.5"}
        }"#;
        let info = parse_ffprobe_output(Path::new("clip.mp4"), json).unwrap();
        assert_eq!(info.codec_name, "aac");
        assert_eq!(info.sample_rate, 48_000);
        assert_eq!(info.bit_rate, None);
        assert_eq!(info.duration, Some(12.5));
    }

    #[test]
    fn test_parse_without_audio_stream() {
        let json = r#"{"streams": [], "format": {"format_name": "mp4"}}"#;
        let result = parse_ffprobe_output(Path::new("x.mp4"), json);
        assert!(matches!(result, Err(Error::FormatDetection { .. })));
    }

    #[test]
    fn test_parse_garbage() {
        let result = parse_ffprobe_output(Path::new("x.mp4"), "not json");
        assert!(matches!(result, Err(Error::FormatDetection { .. })));
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let result = probe_with_ffprobe("marksplit-no-such-ffprobe", Path::new("x.mp3")).await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }
}
