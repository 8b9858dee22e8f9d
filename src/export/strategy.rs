//! Cut planning: strategy selection, frame alignment and output naming.

use super::ExportSettings;
use crate::constants::export::INDEX_WIDTH;
use crate::engine::CutStrategy;
use crate::probe::{AudioFormatInfo, OutputFormat};
use crate::segments::{Segment, frame_duration};
use std::path::{Path, PathBuf};

/// Pick copy or re-encode for exporting `source` as `target`.
///
/// Only MP3 to MP3 is stream-copied, and only when the sample rate is known
/// so cuts can be frame-aligned. Re-encodes keep the source bit rate when the
/// probe reported one.
pub fn select_strategy(
    source: &AudioFormatInfo,
    target: OutputFormat,
    settings: &ExportSettings,
) -> CutStrategy {
    let source_bitrate = source
        .bit_rate
        .filter(|b| *b >= 1000)
        .map(|b| format!("{}k", b / 1000));

    match target {
        OutputFormat::Mp3 if source.is_mp3() && source.sample_rate > 0 => CutStrategy::Copy,
        OutputFormat::Mp3 => CutStrategy::Mp3 {
            bitrate: source_bitrate.unwrap_or_else(|| settings.mp3_bitrate.clone()),
        },
        OutputFormat::M4a => CutStrategy::Aac {
            bitrate: source_bitrate.unwrap_or_else(|| settings.aac_bitrate.clone()),
        },
    }
}

/// Floor `time` to a multiple of one MP3 frame at `sample_rate`.
///
/// A zero sample rate leaves the time untouched.
pub fn align_to_frame(time: f64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return time;
    }
    let frame = frame_duration(sample_rate);
    (time / frame).floor() * frame
}

/// Cut points `(start, duration)` for a segment.
///
/// Copy mode floors both ends to frame boundaries; re-encodes cut exactly.
pub fn cut_points(segment: &Segment, strategy: &CutStrategy, sample_rate: u32) -> (f64, f64) {
    if strategy.is_copy() {
        let start = align_to_frame(segment.start_time, sample_rate);
        let end = align_to_frame(segment.end_time, sample_rate);
        (start, end - start)
    } else {
        (segment.start_time, segment.duration)
    }
}

/// `<dir>/<stem><NNN>.<ext>` for segment `index`.
///
/// `dir` defaults to the source's directory.
pub fn output_path(
    source: &Path,
    output_dir: Option<&Path>,
    index: usize,
    format: OutputFormat,
) -> PathBuf {
    let stem = source
        .file_stem()
        .map_or_else(|| "segment".into(), |s| s.to_string_lossy());
    let dir = output_dir
        .or_else(|| source.parent())
        .unwrap_or_else(|| Path::new("."));

    dir.join(format!(
        "{stem}{index:0width$}.{ext}",
        width = INDEX_WIDTH,
        ext = format.extension()
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn info(container: &str, codec: &str, bit_rate: Option<u64>) -> AudioFormatInfo {
        AudioFormatInfo {
            container_name: container.to_string(),
            codec_name: codec.to_string(),
            sample_rate: 44_100,
            bit_rate,
            duration: Some(100.0),
            channels: Some(2),
        }
    }

    #[test]
    fn test_mp3_to_mp3_copies() {
        let strategy = select_strategy(
            &info("mp3", "mp3", Some(128_000)),
            OutputFormat::Mp3,
            &ExportSettings::default(),
        );
        assert_eq!(strategy, CutStrategy::Copy);
    }

    #[test]
    fn test_mp3_without_sample_rate_is_reencoded() {
        let mut source = info("mp3", "mp3", Some(128_000));
        source.sample_rate = 0;

        let strategy = select_strategy(&source, OutputFormat::Mp3, &ExportSettings::default());
        assert_eq!(
            strategy,
            CutStrategy::Mp3 {
                bitrate: "128k".to_string()
            }
        );

        let segment = Segment {
            start_time: 10.0,
            end_time: 15.0,
            duration: 5.0,
            index: 1,
        };
        assert_eq!(cut_points(&segment, &strategy, 0), (10.0, 5.0));
    }

    #[test]
    fn test_m4a_reencodes_with_source_bitrate() {
        let strategy = select_strategy(
            &info("mov,mp4,m4a,3gp,3g2,mj2", "aac", Some(256_000)),
            OutputFormat::M4a,
            &ExportSettings::default(),
        );
        assert_eq!(
            strategy,
            CutStrategy::Aac {
                bitrate: "256k".to_string()
            }
        );
    }

    #[test]
    fn test_aac_to_mp3_uses_default_bitrate() {
        let settings = ExportSettings {
            mp3_bitrate: "160k".to_string(),
            ..ExportSettings::default()
        };
        let strategy = select_strategy(
            &info("mov,mp4,m4a,3gp,3g2,mj2", "aac", None),
            OutputFormat::Mp3,
            &settings,
        );
        assert_eq!(
            strategy,
            CutStrategy::Mp3 {
                bitrate: "160k".to_string()
            }
        );
    }

    #[test]
    fn test_align_to_frame_is_frame_multiple() {
        for sample_rate in [22_050, 44_100, 48_000] {
            let frame = frame_duration(sample_rate);
            for time in [0.0, 0.5, 10.0, 15.123, 3599.99] {
                let aligned = align_to_frame(time, sample_rate);
                let frames = aligned / frame;
                assert!((frames - frames.round()).abs() < 1e-6);
                assert!(aligned <= time);
                assert!(time - aligned < frame);
            }
        }
    }

    #[test]
    fn test_copy_mode_aligns_cut_points() {
        let segment = Segment {
            start_time: 10.0,
            end_time: 15.0,
            duration: 5.0,
            index: 1,
        };
        let (start, duration) = cut_points(&segment, &CutStrategy::Copy, 44_100);
        let frame = frame_duration(44_100);
        assert!(start <= 10.0 && 10.0 - start < frame);
        let end = start + duration;
        assert!(((end / frame) - (end / frame).round()).abs() < 1e-6);
    }

    #[test]
    fn test_reencode_does_not_align() {
        let segment = Segment {
            start_time: 10.0,
            end_time: 15.0,
            duration: 5.0,
            index: 1,
        };
        let strategy = CutStrategy::Mp3 {
            bitrate: "192k".to_string(),
        };
        assert_eq!(cut_points(&segment, &strategy, 44_100), (10.0, 5.0));
    }

    #[test]
    fn test_output_path_naming() {
        let path = output_path(Path::new("/rec/lecture.m4a"), None, 1, OutputFormat::M4a);
        assert_eq!(path, PathBuf::from("/rec/lecture001.m4a"));

        let path = output_path(
            Path::new("/rec/lecture.m4a"),
            Some(Path::new("/out")),
            12,
            OutputFormat::Mp3,
        );
        assert_eq!(path, PathBuf::from("/out/lecture012.mp3"));
    }
}
