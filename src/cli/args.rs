//! CLI argument definitions.

use crate::cli::validators::{
    MarkArg, parse_duration, parse_mark, parse_positive_seconds, parse_threshold,
};
use crate::output::OutputMode;
use crate::probe::OutputFormat;
use crate::segments::Strictness;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Split recordings into segments between start/end marks.
#[derive(Debug, Parser)]
#[command(name = "marksplit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output mode for results and progress.
    #[arg(long, value_enum, default_value_t = OutputMode::Human, global = true,
          env = "MARKSPLIT_OUTPUT")]
    pub output: OutputMode,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cut a recording into one file per marked segment.
    Split(SplitArgs),
    /// List the segments a set of marks produces, without cutting.
    Segments(SegmentsArgs),
    /// Show format details of a recording.
    Probe {
        /// Recording to inspect.
        input: PathBuf,
    },
    /// Place marks around non-silent regions and list them.
    Automark(AutomarkArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Where marks come from.
#[derive(Debug, Clone, Default, Args)]
pub struct MarkArgs {
    /// Mark as `start:<time>` or `end:<time>`; time is seconds, MM:SS or HH:MM:SS.
    #[arg(short, long = "mark", value_parser = parse_mark)]
    pub marks: Vec<MarkArg>,

    /// JSON file with an array of `{"type": "start"|"end", "time": <seconds>}`.
    #[arg(long)]
    pub marks_file: Option<PathBuf>,
}

/// Segment derivation overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct SegmentOptions {
    /// Minimum segment length preset.
    #[arg(long, value_enum, env = "MARKSPLIT_STRICTNESS")]
    pub strictness: Option<Strictness>,

    /// Minimum segment length in seconds (overrides --strictness).
    #[arg(long, value_parser = parse_positive_seconds)]
    pub min_duration: Option<f64>,
}

/// Silence detection overrides.
#[derive(Debug, Clone, Default, Args)]
pub struct AutomarkOptions {
    /// Peak amplitude (0.0-1.0) above which audio counts as sound.
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f32>,

    /// Silence shorter than this many seconds does not end a region.
    #[arg(long, value_parser = parse_duration)]
    pub min_silence: Option<f64>,

    /// Regions shorter than this many seconds are dropped.
    #[arg(long, value_parser = parse_duration)]
    pub min_sound: Option<f64>,
}

/// Arguments for the split command.
#[derive(Debug, Args)]
pub struct SplitArgs {
    /// Recording to split.
    pub input: PathBuf,

    /// Marks to cut between.
    #[command(flatten)]
    pub marks: MarkArgs,

    /// Add marks around non-silent regions before cutting.
    #[arg(long)]
    pub auto: bool,

    /// Output format (default: same as the source).
    #[arg(short, long, value_enum, env = "MARKSPLIT_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output directory (default: next to the source).
    #[arg(short, long, env = "MARKSPLIT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Kill a segment's transcoder after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Segment derivation overrides.
    #[command(flatten)]
    pub segments: SegmentOptions,

    /// Silence detection overrides (with --auto).
    #[command(flatten)]
    pub automark: AutomarkOptions,
}

/// Arguments for the segments command.
#[derive(Debug, Args)]
pub struct SegmentsArgs {
    /// Recording to take the duration from.
    #[arg(required_unless_present = "duration")]
    pub input: Option<PathBuf>,

    /// Audio duration (instead of probing a recording).
    #[arg(short, long, value_parser = parse_duration)]
    pub duration: Option<f64>,

    /// Marks to derive segments from.
    #[command(flatten)]
    pub marks: MarkArgs,

    /// Segment derivation overrides.
    #[command(flatten)]
    pub segments: SegmentOptions,
}

/// Arguments for the automark command.
#[derive(Debug, Args)]
pub struct AutomarkArgs {
    /// Recording to analyse.
    pub input: PathBuf,

    /// Silence detection overrides.
    #[command(flatten)]
    pub automark: AutomarkOptions,

    /// Segment derivation overrides.
    #[command(flatten)]
    pub segments: SegmentOptions,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::marks::MarkKind;

    #[test]
    fn test_cli_parse_split() {
        let cli = Cli::try_parse_from([
            "marksplit",
            "split",
            "talk.mp3",
            "--mark",
            "start:1",
            "-m",
            "end:12.5",
            "--format",
            "m4a",
            "-q",
        ])
        .unwrap();

        assert!(cli.quiet);
        let Command::Split(args) = cli.command else {
            panic!("expected split");
        };
        assert_eq!(args.input, PathBuf::from("talk.mp3"));
        assert_eq!(args.marks.marks.len(), 2);
        assert_eq!(args.marks.marks[1].kind, MarkKind::End);
        assert_eq!(args.marks.marks[1].time, 12.5);
        assert_eq!(args.format, Some(OutputFormat::M4a));
    }

    #[test]
    fn test_cli_rejects_bad_mark() {
        let cli = Cli::try_parse_from(["marksplit", "split", "a.mp3", "--mark", "middle:3"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_segments_requires_input_or_duration() {
        assert!(Cli::try_parse_from(["marksplit", "segments"]).is_err());

        let cli =
            Cli::try_parse_from(["marksplit", "segments", "--duration", "1:00", "-m", "s:0"])
                .unwrap();
        let Command::Segments(args) = cli.command else {
            panic!("expected segments");
        };
        assert_eq!(args.duration, Some(60.0));
        assert!(args.input.is_none());
    }

    #[test]
    fn test_cli_global_output_mode() {
        let cli = Cli::try_parse_from(["marksplit", "probe", "a.m4a", "--output", "ndjson"])
            .unwrap();
        assert_eq!(cli.output, OutputMode::Ndjson);
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["marksplit", "config", "show"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_rejects_zero_timeout() {
        let cli = Cli::try_parse_from(["marksplit", "split", "a.mp3", "--timeout", "0"]);
        assert!(cli.is_err());
    }
}
