//! Progress reporting infrastructure for CLI output.
//!
//! This module provides a trait for reporting export progress and
//! implementations for the different output modes (human, JSON, NDJSON).

use crate::error::Error;
use crate::export::{ExportEvent, ProgressEvent};
use crate::output::OutputMode;
use crate::output::json_envelope::{
    CancelReason, CancelledPayload, ErrorPayload, ErrorSeverity, EventType, ExportResultPayload,
    ExportStartedPayload, JsonEnvelope, ResultType, SegmentCompletedPayload,
};
use crate::output::progress::{
    abandon_progress, create_export_progress, finish_progress, set_export_progress,
};
use crate::probe::OutputFormat;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;

/// Trait for reporting progress during an export.
///
/// Implementations can output to different formats (human, JSON, NDJSON).
pub trait ExportReporter: Send + Sync {
    /// Report that cutting has begun.
    fn export_started(
        &self,
        source: &Path,
        total_segments: usize,
        source_format: OutputFormat,
        target_format: OutputFormat,
        stream_copy: bool,
    );

    /// Report a progress update.
    fn progress(&self, event: &ProgressEvent);

    /// Report one written segment.
    fn segment_completed(&self, index: usize, total_segments: usize, path: &Path);

    /// Report the finished export.
    fn completed(&self, source: &Path, files: &[PathBuf]);

    /// Report an error.
    fn error(
        &self,
        code: &str,
        severity: ErrorSeverity,
        message: &str,
        suggestion: Option<&str>,
    );

    /// Report cancellation.
    fn cancelled(&self, reason: CancelReason, segments_completed: usize, segments_total: usize);

    /// Dispatch a pipeline event to the matching method.
    fn handle_event(&self, source: &Path, event: &ExportEvent) {
        match event {
            ExportEvent::Started {
                total_segments,
                source_format,
                target_format,
                stream_copy,
            } => self.export_started(
                source,
                *total_segments,
                *source_format,
                *target_format,
                *stream_copy,
            ),
            ExportEvent::Progress(progress) => self.progress(progress),
            ExportEvent::SegmentCompleted {
                index,
                total_segments,
                path,
            } => self.segment_completed(*index, *total_segments, path),
        }
    }
}

/// Progress throttler to limit update frequency.
pub struct ProgressThrottler {
    /// Last reported percentage (0-100).
    last_percent: AtomicU8,
    /// Last update time.
    last_update: Mutex<Instant>,
    /// Minimum time between updates in milliseconds.
    min_interval_ms: u64,
    /// Minimum percentage change between updates.
    min_percent_change: u8,
}

impl ProgressThrottler {
    /// Create a new throttler with default settings (10%, 500ms).
    pub fn new() -> Self {
        Self {
            last_percent: AtomicU8::new(0),
            last_update: Mutex::new(Instant::now()),
            min_interval_ms: 500,
            min_percent_change: 10,
        }
    }

    /// Check if an update at `current_percent` should be emitted.
    #[allow(clippy::cast_possible_truncation)]
    pub fn should_emit(&self, current_percent: u32) -> bool {
        let current = current_percent.min(100) as u8;
        let last = self.last_percent.load(Ordering::Relaxed);

        // 0% and 100% always go out
        if current == 0 || current >= 100 {
            self.mark(current);
            return true;
        }

        let percent_changed = current.saturating_sub(last) >= self.min_percent_change;
        let time_elapsed = self
            .last_update
            .lock()
            .map(|last| last.elapsed().as_millis() >= u128::from(self.min_interval_ms))
            .unwrap_or(true);

        if percent_changed || time_elapsed {
            self.mark(current);
            true
        } else {
            false
        }
    }

    fn mark(&self, percent: u8) {
        self.last_percent.store(percent, Ordering::Relaxed);
        if let Ok(mut last_update) = self.last_update.lock() {
            *last_update = Instant::now();
        }
    }

    /// Reset the throttler for a new export.
    pub fn reset(&self) {
        self.mark(0);
    }
}

impl Default for ProgressThrottler {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON/NDJSON reporter.
pub struct JsonProgressReporter {
    /// Output mode (Json or Ndjson).
    mode: OutputMode,
    /// Progress throttler.
    throttler: ProgressThrottler,
    /// Writer for output (typically stdout).
    writer: Mutex<Box<dyn Write + Send>>,
    /// Buffer for JSON mode (collect all events).
    json_buffer: Mutex<Vec<String>>,
    /// Set once a write to the writer has failed.
    write_failed: AtomicBool,
}

impl JsonProgressReporter {
    /// Create a new JSON reporter writing to stdout.
    pub fn new(mode: OutputMode) -> Self {
        Self::with_boxed_writer(mode, Box::new(io::stdout()))
    }

    /// Create a reporter with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer<W: Write + Send + 'static>(mode: OutputMode, writer: W) -> Self {
        Self::with_boxed_writer(mode, Box::new(writer))
    }

    fn with_boxed_writer(mode: OutputMode, writer: Box<dyn Write + Send>) -> Self {
        Self {
            mode,
            throttler: ProgressThrottler::new(),
            writer: Mutex::new(writer),
            json_buffer: Mutex::new(Vec::new()),
            write_failed: AtomicBool::new(false),
        }
    }

    /// Emit an event as JSON.
    fn emit<T: serde::Serialize>(&self, event: EventType, payload: T) {
        let envelope = JsonEnvelope::new(event, payload);
        let json = match serde_json::to_string(&envelope) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize {event:?} event: {e}");
                return;
            }
        };

        match self.mode {
            OutputMode::Ndjson => {
                if let Ok(mut writer) = self.writer.lock() {
                    if let Err(e) = writeln!(writer, "{json}") {
                        // Only the first failure is logged; a closed pipe fails every write
                        if !self.write_failed.swap(true, Ordering::Relaxed) {
                            tracing::warn!(
                                "Failed to write to stdout: {e} (subsequent errors suppressed)"
                            );
                        }
                    }
                    let _ = writer.flush();
                }
            }
            OutputMode::Json => {
                if let Ok(mut buffer) = self.json_buffer.lock() {
                    buffer.push(json);
                }
            }
            OutputMode::Human => {}
        }
    }

    /// Flush buffered JSON output (for Json mode).
    pub fn flush(&self) {
        if self.mode == OutputMode::Json
            && let Ok(mut buffer) = self.json_buffer.lock()
            && let Ok(mut writer) = self.writer.lock()
        {
            let _ = writeln!(writer, "[");
            for (i, json) in buffer.iter().enumerate() {
                if i > 0 {
                    let _ = writeln!(writer, ",");
                }
                let _ = write!(writer, "  {json}");
            }
            let _ = writeln!(writer);
            let _ = writeln!(writer, "]");
            let _ = writer.flush();
            buffer.clear();
        }
    }
}

impl ExportReporter for JsonProgressReporter {
    fn export_started(
        &self,
        source: &Path,
        total_segments: usize,
        source_format: OutputFormat,
        target_format: OutputFormat,
        stream_copy: bool,
    ) {
        self.throttler.reset();
        self.emit(
            EventType::ExportStarted,
            ExportStartedPayload {
                source: source.to_path_buf(),
                total_segments,
                source_format,
                target_format,
                stream_copy,
            },
        );
    }

    fn progress(&self, event: &ProgressEvent) {
        if self.throttler.should_emit(event.overall_progress) {
            self.emit(EventType::Progress, event);
        }
    }

    fn segment_completed(&self, index: usize, total_segments: usize, path: &Path) {
        self.emit(
            EventType::SegmentCompleted,
            SegmentCompletedPayload {
                index,
                total_segments,
                path: path.to_path_buf(),
            },
        );
    }

    fn completed(&self, source: &Path, files: &[PathBuf]) {
        self.emit(
            EventType::Result,
            ExportResultPayload {
                result_type: ResultType::Export,
                source: source.to_path_buf(),
                files: files.to_vec(),
            },
        );
        self.flush();
    }

    fn error(
        &self,
        code: &str,
        severity: ErrorSeverity,
        message: &str,
        suggestion: Option<&str>,
    ) {
        self.emit(
            EventType::Error,
            ErrorPayload {
                code: code.to_string(),
                severity,
                message: message.to_string(),
                suggestion: suggestion.map(ToString::to_string),
            },
        );
        if severity == ErrorSeverity::Fatal {
            self.flush();
        }
    }

    fn cancelled(&self, reason: CancelReason, segments_completed: usize, segments_total: usize) {
        self.emit(
            EventType::Cancelled,
            CancelledPayload {
                reason,
                segments_completed,
                segments_total,
            },
        );
        self.flush();
    }
}

/// Terminal reporter drawing an `indicatif` bar.
pub struct HumanReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl HumanReporter {
    /// Create a reporter; the bar appears once the export starts.
    pub const fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut bar| bar.take())
    }
}

impl Default for HumanReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportReporter for HumanReporter {
    fn export_started(
        &self,
        source: &Path,
        total_segments: usize,
        source_format: OutputFormat,
        target_format: OutputFormat,
        stream_copy: bool,
    ) {
        let mode = if stream_copy { "stream copy" } else { "re-encode" };
        println!(
            "Splitting {} into {total_segments} segment(s) ({source_format} -> {target_format}, {mode})",
            source.display()
        );
        if let Ok(mut bar) = self.bar.lock() {
            *bar = create_export_progress(total_segments, true);
        }
    }

    fn progress(&self, event: &ProgressEvent) {
        if let Ok(bar) = self.bar.lock() {
            set_export_progress(
                bar.as_ref(),
                event.overall_progress,
                event.current_segment,
                event.total_segments,
            );
        }
    }

    fn segment_completed(&self, index: usize, total_segments: usize, path: &Path) {
        let line = format!("  [{index}/{total_segments}] {}", path.display());
        match self.bar.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }

    fn completed(&self, _source: &Path, files: &[PathBuf]) {
        finish_progress(self.take_bar(), "done");
        println!("Wrote {} file(s)", files.len());
    }

    // The message itself is printed by the binary on exit.
    fn error(
        &self,
        _code: &str,
        _severity: ErrorSeverity,
        _message: &str,
        suggestion: Option<&str>,
    ) {
        abandon_progress(self.take_bar());
        if let Some(suggestion) = suggestion {
            eprintln!("hint: {suggestion}");
        }
    }

    fn cancelled(&self, _reason: CancelReason, segments_completed: usize, segments_total: usize) {
        abandon_progress(self.take_bar());
        eprintln!(
            "Cancelled after {segments_completed} of {segments_total} segment(s); partial output removed"
        );
    }
}

/// Reporter that prints nothing (quiet mode).
pub struct NullReporter;

impl ExportReporter for NullReporter {
    fn export_started(
        &self,
        _source: &Path,
        _total_segments: usize,
        _source_format: OutputFormat,
        _target_format: OutputFormat,
        _stream_copy: bool,
    ) {
    }
    fn progress(&self, _event: &ProgressEvent) {}
    fn segment_completed(&self, _index: usize, _total_segments: usize, _path: &Path) {}
    fn completed(&self, _source: &Path, _files: &[PathBuf]) {}
    fn error(
        &self,
        _code: &str,
        _severity: ErrorSeverity,
        _message: &str,
        _suggestion: Option<&str>,
    ) {
    }
    fn cancelled(&self, _reason: CancelReason, _segments_completed: usize, _segments_total: usize) {
    }
}

/// Create a reporter based on output mode.
pub fn create_reporter(mode: OutputMode, quiet: bool) -> Box<dyn ExportReporter> {
    match mode {
        OutputMode::Human if quiet => Box::new(NullReporter),
        OutputMode::Human => Box::new(HumanReporter::new()),
        OutputMode::Json | OutputMode::Ndjson => Box::new(JsonProgressReporter::new(mode)),
    }
}

/// Emit a JSON result event to stdout.
///
/// Used by command handlers that produce a single result in JSON or NDJSON
/// output mode.
pub fn emit_json_result<T: serde::Serialize>(payload: &T) {
    let envelope = JsonEnvelope::new(EventType::Result, payload);
    match serde_json::to_string(&envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            // stderr keeps the JSON stream clean
            eprintln!("error: failed to serialize JSON result: {e}");
        }
    }
}

/// Emit a fatal JSON error event to stdout.
pub fn emit_json_error(error: &Error) {
    let envelope = JsonEnvelope::new(EventType::Error, ErrorPayload::from_error(error));
    match serde_json::to_string(&envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize JSON error: {e}"),
    }
}
