//! Progress bar utilities for exports.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a bar tracking overall export progress in percent.
pub fn create_export_progress(total_segments: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_segments == 0 {
        return None;
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(format!("segment 1/{total_segments}"));
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Update the bar from an overall percentage and current segment.
pub fn set_export_progress(
    pb: Option<&ProgressBar>,
    overall: u32,
    current_segment: usize,
    total_segments: usize,
) {
    if let Some(pb) = pb {
        pb.set_position(u64::from(overall.min(100)));
        pb.set_message(format!("segment {current_segment}/{total_segments}"));
    }
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// Remove a progress bar from the terminal.
pub fn abandon_progress(pb: Option<ProgressBar>) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}
