//! Progress aggregation across segments.

use serde::Serialize;

/// Progress of one export run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 1-based index of the segment being cut.
    pub current_segment: usize,
    /// Number of segments in the run.
    pub total_segments: usize,
    /// Progress of the current segment in percent.
    pub current_progress: f64,
    /// Progress of the whole run in percent, never decreasing.
    pub overall_progress: u32,
}

/// Folds per-segment progress into a monotonic overall percentage.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    total: usize,
    overall: u32,
}

impl ProgressAggregator {
    /// Aggregator for `total` segments.
    pub const fn new(total: usize) -> Self {
        Self { total, overall: 0 }
    }

    /// Record `percent` of segment `index` (0-based) and build the event.
    ///
    /// `overall = min(100, round((index + percent/100) / total * 100))`,
    /// floored at the previous value.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn update(&mut self, index: usize, percent: f64) -> ProgressEvent {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let total = self.total.max(1);

        let raw = ((index as f64 + percent / 100.0) / total as f64 * 100.0)
            .round()
            .min(100.0) as u32;
        self.overall = self.overall.max(raw);

        ProgressEvent {
            current_segment: index + 1,
            total_segments: self.total,
            current_progress: percent,
            overall_progress: self.overall,
        }
    }

    /// Last reported overall percentage.
    pub const fn overall(&self) -> u32 {
        self.overall
    }
}
