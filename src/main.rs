//! marksplit CLI entry point.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use marksplit::CommandOutcome;

fn main() {
    match marksplit::run() {
        Ok(CommandOutcome::Completed) => {}
        Ok(CommandOutcome::Cancelled) => std::process::exit(130), // 128 + SIGINT(2)
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
