//! Automatic marking around non-silent regions.
//!
//! A window is loud when its peak amplitude exceeds the threshold. Loud
//! windows separated by less than `min_silence` are merged into one region;
//! regions shorter than `min_sound`, or with too few loud windows, are
//! dropped. Every kept region becomes a start/end mark pair.

use crate::audio::{PeakEnvelope, decode_peak_envelope};
use crate::config::AutomarkSettings;
use crate::error::Result;
use crate::marks::{MarkKind, MarkRegistry};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// A detected stretch of sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundRegion {
    /// Start in seconds.
    pub start_time: f64,
    /// End in seconds.
    pub end_time: f64,
    /// Fraction of loud windows inside the region.
    pub valid_ratio: f32,
}

/// Result of [`auto_mark`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomarkReport {
    /// Regions that passed all thresholds.
    pub regions: Vec<SoundRegion>,
    /// Marks actually added to the registry.
    pub marks_added: usize,
    /// Duration of the analysed recording in seconds.
    pub duration: f64,
}

/// Find sound regions in a peak envelope.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn detect_regions(envelope: &PeakEnvelope, settings: &AutomarkSettings) -> Vec<SoundRegion> {
    if envelope.peaks.is_empty() || envelope.window_secs <= 0.0 {
        return Vec::new();
    }

    // Adjacent loud windows always merge.
    let max_gap = ((settings.min_silence / envelope.window_secs).ceil() as usize).max(1);

    // (first loud window, last loud window, loud window count)
    let mut runs: Vec<(usize, usize, usize)> = Vec::new();
    for (i, peak) in envelope.peaks.iter().enumerate() {
        if *peak <= settings.threshold {
            continue;
        }
        match runs.last_mut() {
            Some((_, last, count)) if i - *last - 1 < max_gap => {
                *last = i;
                *count += 1;
            }
            _ => runs.push((i, i, 1)),
        }
    }

    runs.into_iter()
        .filter_map(|(first, last, loud)| {
            let start_time = first as f64 * envelope.window_secs;
            let end_time = ((last + 1) as f64 * envelope.window_secs).min(envelope.duration_secs);
            let windows = last - first + 1;
            let valid_ratio = loud as f32 / windows as f32;

            (end_time - start_time >= settings.min_sound
                && valid_ratio >= settings.min_valid_ratio)
                .then_some(SoundRegion {
                    start_time,
                    end_time,
                    valid_ratio,
                })
        })
        .collect()
}

/// Decode `path`, detect sound regions, and add a start/end pair per region.
///
/// Marks rejected by the registry (for example because one already exists at
/// that position) are logged and skipped.
pub fn auto_mark(
    path: &Path,
    registry: &mut MarkRegistry,
    settings: &AutomarkSettings,
) -> Result<AutomarkReport> {
    info!("Analysing {} for sound regions", path.display());
    let envelope = decode_peak_envelope(path, settings.window_ms)?;
    let regions = detect_regions(&envelope, settings);

    let mut marks_added = 0;
    for region in &regions {
        for (kind, time) in [
            (MarkKind::Start, region.start_time),
            (MarkKind::End, region.end_time),
        ] {
            match registry.add_mark(kind, time) {
                Ok(_) => marks_added += 1,
                Err(reason) => warn!("Skipping automatic {kind} mark at {time:.2}s: {reason}"),
            }
        }
    }

    info!(
        "Found {} sound region(s) in {:.1}s of audio",
        regions.len(),
        envelope.duration_secs
    );

    Ok(AutomarkReport {
        regions,
        marks_added,
        duration: envelope.duration_secs,
    })
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    /// Envelope with 0.1 s windows.
    fn envelope(peaks: &[f32]) -> PeakEnvelope {
        PeakEnvelope {
            peaks: peaks.to_vec(),
            window_secs: 0.1,
            sample_rate: 1000,
            duration_secs: peaks.len() as f64 * 0.1,
        }
    }

    fn settings() -> AutomarkSettings {
        AutomarkSettings {
            threshold: 0.1,
            window_ms: 100,
            min_silence: 0.3,
            min_sound: 0.5,
            min_valid_ratio: 0.5,
        }
    }

    #[test]
    fn test_single_region() {
        let mut peaks = vec![0.0; 30];
        for p in &mut peaks[10..20] {
            *p = 0.5;
        }
        let regions = detect_regions(&envelope(&peaks), &settings());
        assert_eq!(regions.len(), 1);
        assert!((regions[0].start_time - 1.0).abs() < 1e-9);
        assert!((regions[0].end_time - 2.0).abs() < 1e-9);
        assert_eq!(regions[0].valid_ratio, 1.0);
    }

    #[test]
    fn test_short_gap_merges() {
        let mut peaks = vec![0.0; 40];
        for p in &mut peaks[5..10] {
            *p = 0.5;
        }
        // Two silent windows (0.2 s) < min_silence.
        for p in &mut peaks[12..17] {
            *p = 0.5;
        }
        let regions = detect_regions(&envelope(&peaks), &settings());
        assert_eq!(regions.len(), 1);
        assert!((regions[0].start_time - 0.5).abs() < 1e-9);
        assert!((regions[0].end_time - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_long_gap_splits() {
        let mut peaks = vec![0.0; 40];
        for p in &mut peaks[5..11] {
            *p = 0.5;
        }
        for p in &mut peaks[20..30] {
            *p = 0.5;
        }
        let regions = detect_regions(&envelope(&peaks), &settings());
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_short_blip_dropped() {
        let mut peaks = vec![0.0; 20];
        peaks[5] = 0.9;
        peaks[6] = 0.9;
        assert!(detect_regions(&envelope(&peaks), &settings()).is_empty());
    }

    #[test]
    fn test_silence_yields_nothing() {
        assert!(detect_regions(&envelope(&[0.01; 50]), &settings()).is_empty());
        assert!(detect_regions(&envelope(&[]), &settings()).is_empty());
    }
}
