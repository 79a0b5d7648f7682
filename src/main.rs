//! wg - dependency-aware work tracker.

use clap::Parser;
use workgraph::cli::{Cli, report_error};
use workgraph::logging;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::init_logging(cli.verbose, cli.quiet, cli.json) {
        eprintln!("Failed to initialize logging: {err}");
    }

    if let Err(failure) = cli.run() {
        std::process::exit(report_error(&failure.error, failure.json));
    }
}
