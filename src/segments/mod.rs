//! Segment derivation.
//!
//! Turns an unordered mark set into the ordered, non-overlapping list of
//! exportable ranges. Derivation is pure and never touches the registry.

use crate::constants::codec::MP3_SAMPLES_PER_FRAME;
use crate::constants::segments::{
    DEFAULT_TOLERANCE_SAMPLE_RATE, DURATION_EPSILON, RELAXED_MIN_DURATION, STRICT_MIN_DURATION,
};
use crate::marks::{Mark, MarkKind};
use serde::{Deserialize, Serialize};

/// A validated range between a start mark and the following end mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Start in seconds.
    pub start_time: f64,
    /// End in seconds, never past the audio duration.
    pub end_time: f64,
    /// `end_time - start_time`.
    pub duration: f64,
    /// 1-based position by ascending start time.
    pub index: usize,
}

/// How short a segment may be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Segments must last at least one second.
    #[default]
    Strict,
    /// Segments must last at least a tenth of a second.
    Relaxed,
}

impl Strictness {
    /// Minimum segment duration in seconds.
    pub const fn min_duration(self) -> f64 {
        match self {
            Self::Strict => STRICT_MIN_DURATION,
            Self::Relaxed => RELAXED_MIN_DURATION,
        }
    }
}

/// Acceptance rules for [`derive_segments`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPolicy {
    /// Minimum accepted `end - start`, in seconds.
    pub min_duration: f64,
    /// How far an end mark may sit past the audio duration, in seconds.
    pub end_tolerance: f64,
}

impl SegmentPolicy {
    /// Policy for the given strictness, with a one-frame tolerance at the
    /// default sample rate.
    pub fn new(strictness: Strictness) -> Self {
        Self {
            min_duration: strictness.min_duration(),
            end_tolerance: frame_duration(DEFAULT_TOLERANCE_SAMPLE_RATE),
        }
    }

    /// Override the minimum duration.
    #[must_use]
    pub const fn with_min_duration(mut self, min_duration: f64) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// Derive the end tolerance from the probed sample rate.
    ///
    /// A zero sample rate keeps the current tolerance.
    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        if sample_rate > 0 {
            self.end_tolerance = frame_duration(sample_rate);
        }
        self
    }
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        Self::new(Strictness::default())
    }
}

/// Duration of one MP3 frame at `sample_rate`, in seconds.
pub fn frame_duration(sample_rate: u32) -> f64 {
    f64::from(MP3_SAMPLES_PER_FRAME) / f64::from(sample_rate)
}

/// Derive exportable segments from `marks`.
///
/// Marks are sorted by time (start before end on ties) and scanned in
/// adjacent pairs. A start followed directly by an end forms a segment when
/// both lie inside `[0, audio_duration + end_tolerance]` and the pair, with
/// its end clamped to `audio_duration`, spans at least `min_duration`; both
/// marks are then consumed. Any other pair advances
/// the scan by one mark, so an unpaired start is dropped.
pub fn derive_segments(marks: &[Mark], audio_duration: f64, policy: &SegmentPolicy) -> Vec<Segment> {
    if marks.is_empty() || !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Vec::new();
    }

    let mut sorted = marks.to_vec();
    sorted.sort_by(|a, b| {
        a.time
            .total_cmp(&b.time)
            .then(a.kind.cmp(&b.kind))
            .then(a.id.cmp(&b.id))
    });

    let limit = audio_duration + policy.end_tolerance;
    let mut segments = Vec::new();
    let mut i = 0;

    while i + 1 < sorted.len() {
        let current = &sorted[i];
        let next = &sorted[i + 1];

        let is_pair = current.kind == MarkKind::Start && next.kind == MarkKind::End;
        let in_range = current.time >= 0.0 && next.time <= limit;

        let end_time = next.time.min(audio_duration);
        let long_enough = end_time - current.time + DURATION_EPSILON >= policy.min_duration;

        if is_pair && in_range && long_enough {
            segments.push(Segment {
                start_time: current.time,
                end_time,
                duration: end_time - current.time,
                index: segments.len() + 1,
            });
            i += 2;
        } else {
            i += 1;
        }
    }

    segments
}

/// Format seconds as `HH:MM:SS:CC` (centiseconds).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_timestamp(seconds: f64) -> String {
    let total_centis = if seconds.is_finite() && seconds > 0.0 {
        // Small bias so values like 10.29 don't floor to 28 centiseconds.
        (seconds * 100.0 + 1e-6).floor() as u64
    } else {
        0
    };

    let centis = total_centis % 100;
    let total_secs = total_centis / 100;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{hours:02}:{minutes:02}:{secs:02}:{centis:02}")
}
