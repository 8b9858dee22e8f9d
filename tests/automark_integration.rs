//! Integration tests for automatic marking on synthesised WAV files.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use marksplit::audio::decode_peak_envelope;
use marksplit::automark::auto_mark;
use marksplit::config::AutomarkSettings;
use marksplit::marks::{MarkKind, MarkRegistry};
use marksplit::segments::{SegmentPolicy, derive_segments};
use std::f32::consts::PI;
use std::path::Path;
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 16_000;

/// Write a mono 16-bit WAV made of (seconds, amplitude) sections of a 440 Hz tone.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn write_wav(path: &Path, sections: &[(f32, f32)]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    let mut n = 0u32;
    for &(seconds, amplitude) in sections {
        let count = (seconds * SAMPLE_RATE as f32) as u32;
        for _ in 0..count {
            let t = n as f32 / SAMPLE_RATE as f32;
            let sample = amplitude * (2.0 * PI * 440.0 * t).sin();
            writer
                .write_sample((sample * f32::from(i16::MAX)) as i16)
                .unwrap();
            n += 1;
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn test_envelope_duration_matches_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, &[(2.0, 0.5)]);

    let envelope = decode_peak_envelope(&path, 10).unwrap();
    assert_eq!(envelope.sample_rate, SAMPLE_RATE);
    assert!((envelope.duration_secs - 2.0).abs() < 1e-6);
    assert_eq!(envelope.peaks.len(), 200);
    assert!(envelope.peaks.iter().all(|p| *p > 0.4));
}

#[test]
fn test_tone_in_silence_gets_start_and_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, &[(1.0, 0.0), (2.0, 0.5), (1.0, 0.0)]);

    let mut registry = MarkRegistry::new();
    let report = auto_mark(&path, &mut registry, &AutomarkSettings::default()).unwrap();

    assert_eq!(report.regions.len(), 1);
    assert_eq!(report.marks_added, 2);
    assert!((report.duration - 4.0).abs() < 1e-6);

    let marks = registry.list_marks();
    assert_eq!(marks.len(), 2);
    assert_eq!(marks[0].kind, MarkKind::Start);
    assert_eq!(marks[1].kind, MarkKind::End);
    assert!((marks[0].time - 1.0).abs() <= 0.02, "start at {}", marks[0].time);
    assert!((marks[1].time - 3.0).abs() <= 0.02, "end at {}", marks[1].time);

    let segments = derive_segments(&marks, report.duration, &SegmentPolicy::default());
    assert_eq!(segments.len(), 1);
    assert!((segments[0].duration - 2.0).abs() <= 0.04);
}

#[test]
fn test_two_tones_separated_by_long_silence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("two.wav");
    write_wav(
        &path,
        &[(0.5, 0.0), (1.5, 0.5), (1.0, 0.0), (1.5, 0.5), (0.5, 0.0)],
    );

    let mut registry = MarkRegistry::new();
    let report = auto_mark(&path, &mut registry, &AutomarkSettings::default()).unwrap();

    assert_eq!(report.regions.len(), 2);
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_silence_adds_no_marks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("silence.wav");
    write_wav(&path, &[(3.0, 0.0)]);

    let mut registry = MarkRegistry::new();
    let report = auto_mark(&path, &mut registry, &AutomarkSettings::default()).unwrap();

    assert!(report.regions.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn test_existing_marks_are_not_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, &[(1.0, 0.0), (2.0, 0.5), (1.0, 0.0)]);

    let mut registry = MarkRegistry::new();
    let first = auto_mark(&path, &mut registry, &AutomarkSettings::default()).unwrap();
    let second = auto_mark(&path, &mut registry, &AutomarkSettings::default()).unwrap();

    assert_eq!(first.marks_added, 2);
    assert_eq!(second.marks_added, 0);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_missing_file_is_an_open_error() {
    let mut registry = MarkRegistry::new();
    let result = auto_mark(
        Path::new("/nonexistent/recording.wav"),
        &mut registry,
        &AutomarkSettings::default(),
    );
    assert_eq!(result.unwrap_err().code(), "audio_decode");
}
