//! Thin CLI entry point. Parses arguments, installs logging, and dispatches
//! to the library's verb handlers against the reference container factory.

use clap::Parser;
use modlaunch::cli::{default_factory, run, Cli};

fn main() {
    let _guard = modlaunch::logging::init();

    let cli = Cli::parse();
    let factory = default_factory();

    if let Err(err) = run(cli.command, &factory) {
        tracing::error!(error = %err, "command failed");
        std::process::exit(err.exit_code());
    }
}
