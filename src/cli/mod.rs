//! CLI argument parsing.

mod args;
pub mod validators;

pub use args::{
    AutomarkArgs, AutomarkOptions, Cli, Command, ConfigAction, MarkArgs, SegmentOptions,
    SegmentsArgs, SplitArgs,
};
pub use validators::MarkArg;
