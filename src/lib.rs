//! marksplit - split recordings between start/end marks.
//!
//! This crate provides the mark registry, segment derivation, format probing
//! and the cancellable ffmpeg export pipeline behind the `marksplit` CLI.

#![warn(missing_docs)]

pub mod audio;
pub mod automark;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod export;
pub mod marks;
pub mod output;
pub mod probe;
pub mod segments;

use clap::Parser;
use cli::{
    AutomarkArgs, AutomarkOptions, Cli, Command, ConfigAction, MarkArgs, SegmentOptions,
    SegmentsArgs, SplitArgs,
};
use config::{
    AutomarkSettings, Config, config_file_path, load_default_config, save_default_config,
    validate_automark, validate_config,
};
use constants::AUDIO_EXTENSIONS;
use engine::{FfmpegEngine, TranscodeEngine};
use export::{ExportEvent, ExportOutcome, ExportPipeline, ExportRequest, check_source};
use marks::{MarkRegistry, load_marks_file, read_marks_into};
use output::{
    AutomarkResultPayload, CancelReason, ConfigResultPayload, ErrorSeverity, ExportReporter,
    OutputMode, ProbeResultPayload, ResultType, SegmentsResultPayload, create_reporter,
    emit_json_error, emit_json_result,
};
use probe::AudioFormatInfo;
use segments::{Segment, SegmentPolicy, derive_segments, format_timestamp};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

pub use error::{Error, Result};

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran to completion.
    Completed,
    /// The export was cancelled; its files were removed.
    Cancelled,
}

/// Main entry point for the marksplit CLI.
pub fn run() -> Result<CommandOutcome> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let mode = cli.output;
    // Split reports its own failures through the export reporter
    let reports_own_errors = matches!(cli.command, Command::Split(_));

    let result = handle_command(cli.command, mode, cli.quiet);
    if let Err(e) = &result
        && mode.is_structured()
        && !reports_own_errors
    {
        emit_json_error(e);
    }
    result
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    // stdout is reserved for results
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_command(command: Command, mode: OutputMode, quiet: bool) -> Result<CommandOutcome> {
    match command {
        Command::Split(args) => return handle_split(&args, mode, quiet),
        Command::Segments(args) => handle_segments(&args, mode)?,
        Command::Probe { input } => handle_probe(&input, mode)?,
        Command::Automark(args) => handle_automark(&args, mode)?,
        Command::Config { action } => handle_config_command(action, mode)?,
    }
    Ok(CommandOutcome::Completed)
}

fn load_config() -> Result<Config> {
    let config = load_default_config()?;
    validate_config(&config)?;
    Ok(config)
}

fn handle_segments(args: &SegmentsArgs, mode: OutputMode) -> Result<()> {
    let config = load_config()?;
    let registry = collect_marks(&args.marks)?;

    let (duration, sample_rate) = match (args.duration, &args.input) {
        (Some(duration), _) => (duration, 0),
        (None, Some(input)) => {
            let info = runtime()?.block_on(probe_source(&engine_for(&config), input))?;
            (known_duration(&info, input)?, info.sample_rate)
        }
        (None, None) => {
            return Err(Error::Internal {
                message: "either an input file or --duration is required".to_string(),
            });
        }
    };

    let policy = segment_policy(&config, &args.segments).with_sample_rate(sample_rate);
    let marks = registry.list_marks();
    let segments = derive_segments(&marks, duration, &policy);
    if mode.is_structured() {
        emit_json_result(&SegmentsResultPayload {
            result_type: ResultType::Segments,
            duration,
            marks,
            segments,
        });
    } else {
        print_segments(&segments);
    }
    Ok(())
}

fn handle_probe(input: &Path, mode: OutputMode) -> Result<()> {
    let config = load_config()?;
    let info = runtime()?.block_on(probe_source(&engine_for(&config), input))?;
    let export_format = info.classify(input).ok();

    if mode.is_structured() {
        emit_json_result(&ProbeResultPayload {
            result_type: ResultType::Probe,
            path: input.to_path_buf(),
            format: info,
            export_format,
        });
        return Ok(());
    }

    println!("File:        {}", input.display());
    println!("Container:   {}", info.container_name);
    println!("Codec:       {}", info.codec_name);
    println!("Sample rate: {} Hz", info.sample_rate);
    if let Some(channels) = info.channels {
        println!("Channels:    {channels}");
    }
    if let Some(bit_rate) = info.bit_rate {
        println!("Bit rate:    {} kb/s", bit_rate / 1000);
    }
    if let Some(duration) = info.duration {
        println!("Duration:    {}", format_timestamp(duration));
    }
    match export_format {
        Some(format) => println!("Exports as:  {format}"),
        None => println!("Exports as:  unsupported"),
    }
    Ok(())
}

fn handle_automark(args: &AutomarkArgs, mode: OutputMode) -> Result<()> {
    let config = load_config()?;
    check_source(&args.input)?;
    let settings = automark_settings(&config, &args.automark)?;

    let mut registry = MarkRegistry::new();
    let report = automark::auto_mark(&args.input, &mut registry, &settings)?;

    let marks = registry.list_marks();
    let policy = segment_policy(&config, &args.segments);
    let segments = derive_segments(&marks, report.duration, &policy);

    if mode.is_structured() {
        emit_json_result(&AutomarkResultPayload {
            result_type: ResultType::Automark,
            source: args.input.clone(),
            report,
            marks,
            segments,
        });
        return Ok(());
    }

    println!(
        "Found {} sound region(s) in {}",
        report.regions.len(),
        args.input.display()
    );
    for mark in &marks {
        println!("  {:<5} {}", mark.kind.to_string(), format_timestamp(mark.time));
    }
    print_segments(&segments);
    Ok(())
}

fn handle_config_command(action: ConfigAction, mode: OutputMode) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            if mode.is_structured() {
                emit_json_result(&ConfigResultPayload {
                    result_type: ResultType::Config,
                    path: config_file_path()?,
                    config,
                });
            } else {
                let text = toml::to_string_pretty(&config)
                    .map_err(|e| Error::ConfigSerialize { source: e })?;
                print!("{text}");
            }
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn handle_split(args: &SplitArgs, mode: OutputMode, quiet: bool) -> Result<CommandOutcome> {
    let reporter = create_reporter(mode, quiet);

    let result = load_config().and_then(|config| split(args, &config, reporter.as_ref()));
    if let Err(e) = &result {
        reporter.error(e.code(), ErrorSeverity::Fatal, &e.to_string(), e.suggestion());
    }
    result
}

fn split(
    args: &SplitArgs,
    config: &Config,
    reporter: &dyn ExportReporter,
) -> Result<CommandOutcome> {
    check_source(&args.input)?;
    warn_unknown_extension(&args.input);

    let mut registry = collect_marks(&args.marks)?;
    if args.auto {
        let settings = automark_settings(config, &args.automark)?;
        let report = automark::auto_mark(&args.input, &mut registry, &settings)?;
        info!("Added {} automatic mark(s)", report.marks_added);
    }

    let runtime = runtime()?;
    let engine = Arc::new(engine_for(config));
    let info = runtime.block_on(probe_source(engine.as_ref(), &args.input))?;
    let duration = known_duration(&info, &args.input)?;

    let policy = segment_policy(config, &args.segments).with_sample_rate(info.sample_rate);
    let segments = derive_segments(&registry.list_marks(), duration, &policy);
    if segments.is_empty() {
        return Err(Error::NoValidSegments);
    }
    info!(
        "Derived {} segment(s) from {} mark(s)",
        segments.len(),
        registry.len()
    );

    let mut settings = config.export.settings();
    if let Some(timeout) = args.timeout {
        settings.segment_timeout = Some(Duration::from_secs(timeout));
    }

    let pipeline = ExportPipeline::new(engine, settings);
    let request = ExportRequest {
        source: args.input.clone(),
        segments,
        target: args.format,
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| config.export.output_dir.clone()),
        probed: Some(info),
    };

    runtime.block_on(async {
        let mut handle = pipeline.start(request)?;
        install_cancel_handler(pipeline.clone());

        let total = handle.total_segments();
        let mut completed = 0;
        while let Some(event) = handle.next_event().await {
            if matches!(event, ExportEvent::SegmentCompleted { .. }) {
                completed += 1;
            }
            reporter.handle_event(&args.input, &event);
        }

        match handle.wait().await {
            ExportOutcome::Completed { files } => {
                reporter.completed(&args.input, &files);
                Ok(CommandOutcome::Completed)
            }
            ExportOutcome::Cancelled => {
                reporter.cancelled(CancelReason::UserRequest, completed, total);
                Ok(CommandOutcome::Cancelled)
            }
            ExportOutcome::Failed { error } => Err(error),
        }
    })
}

/// Ctrl+C cancels the export; a second Ctrl+C exits immediately.
fn install_cancel_handler(pipeline: ExportPipeline) {
    let interrupted = AtomicBool::new(false);
    if let Err(e) = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            std::process::exit(130); // 128 + SIGINT(2)
        }
        if pipeline.cancel_active() {
            warn!("Cancelling export, removing partial output");
        }
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("failed to create async runtime: {e}"),
    })
}

fn engine_for(config: &Config) -> FfmpegEngine {
    FfmpegEngine::new(config.tools.ffmpeg.clone(), config.tools.ffprobe.clone())
}

async fn probe_source(engine: &dyn TranscodeEngine, path: &Path) -> Result<AudioFormatInfo> {
    check_source(path)?;
    let info = engine.probe(path).await?;
    debug!(
        "Probed {}: container={}, codec={}, {} Hz",
        path.display(),
        info.container_name,
        info.codec_name,
        info.sample_rate
    );
    Ok(info)
}

fn known_duration(info: &AudioFormatInfo, path: &Path) -> Result<f64> {
    info.duration.ok_or_else(|| Error::FormatDetection {
        path: path.to_path_buf(),
        reason: "duration is unknown".to_string(),
    })
}

fn collect_marks(args: &MarkArgs) -> Result<MarkRegistry> {
    let mut registry = MarkRegistry::new();

    if let Some(path) = &args.marks_file {
        let entries = load_marks_file(path)?;
        let added = read_marks_into(&mut registry, &entries);
        debug!("Loaded {added} of {} mark(s) from {}", entries.len(), path.display());
    }

    for mark in &args.marks {
        if let Err(reason) = registry.add_mark(mark.kind, mark.time) {
            warn!("Skipping {} mark at {:.2}s: {reason}", mark.kind, mark.time);
        }
    }

    Ok(registry)
}

fn segment_policy(config: &Config, options: &SegmentOptions) -> SegmentPolicy {
    let mut section = config.segments.clone();
    if let Some(strictness) = options.strictness {
        section.strictness = strictness;
        section.min_duration = None;
    }
    if let Some(min_duration) = options.min_duration {
        section.min_duration = Some(min_duration);
    }
    section.policy()
}

fn automark_settings(config: &Config, options: &AutomarkOptions) -> Result<AutomarkSettings> {
    let mut settings = config.automark.clone();
    if let Some(threshold) = options.threshold {
        settings.threshold = threshold;
    }
    if let Some(min_silence) = options.min_silence {
        settings.min_silence = min_silence;
    }
    if let Some(min_sound) = options.min_sound {
        settings.min_sound = min_sound;
    }
    validate_automark(&settings)?;
    Ok(settings)
}

fn warn_unknown_extension(path: &Path) {
    let known = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
    if !known {
        warn!(
            "{} does not have a recognised audio extension; relying on probe",
            path.display()
        );
    }
}

fn print_segments(segments: &[Segment]) {
    if segments.is_empty() {
        println!("No valid segments");
        return;
    }
    println!("Segments ({}):", segments.len());
    for segment in segments {
        println!(
            "  {:03}  {} -> {}  {:.2}s",
            segment.index,
            format_timestamp(segment.start_time),
            format_timestamp(segment.end_time),
            segment.duration
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::marks::MarkKind;
    use crate::segments::Strictness;

    #[test]
    fn test_segment_policy_cli_strictness_overrides_config_minimum() {
        let mut config = Config::default();
        config.segments.min_duration = Some(3.0);

        let policy = segment_policy(&config, &SegmentOptions::default());
        assert_eq!(policy.min_duration, 3.0);

        let options = SegmentOptions {
            strictness: Some(Strictness::Relaxed),
            min_duration: None,
        };
        assert_eq!(segment_policy(&config, &options).min_duration, 0.1);

        let options = SegmentOptions {
            strictness: Some(Strictness::Relaxed),
            min_duration: Some(0.5),
        };
        assert_eq!(segment_policy(&config, &options).min_duration, 0.5);
    }

    #[test]
    fn test_automark_settings_overrides_are_validated() {
        let config = Config::default();
        let options = AutomarkOptions {
            threshold: Some(0.2),
            min_silence: None,
            min_sound: Some(0.25),
        };
        let settings = automark_settings(&config, &options).unwrap();
        assert_eq!(settings.threshold, 0.2);
        assert_eq!(settings.min_sound, 0.25);
        assert_eq!(settings.window_ms, config.automark.window_ms);
    }

    #[test]
    fn test_collect_marks_skips_collisions() {
        let args = MarkArgs {
            marks: vec![
                cli::MarkArg {
                    kind: MarkKind::Start,
                    time: 1.0,
                },
                cli::MarkArg {
                    kind: MarkKind::Start,
                    time: 1.004,
                },
                cli::MarkArg {
                    kind: MarkKind::End,
                    time: 5.0,
                },
            ],
            marks_file: None,
        };
        let registry = collect_marks(&args).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
