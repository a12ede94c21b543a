//! Platman CLI - hardware platform manager
//!
//! Entry point for the platman command-line application.

use clap::Parser;
use tracing::Level;

use platman::cli::output::display_error;
use platman::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, _) => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = cli.run().await {
        display_error(&e);
        std::process::exit(1);
    }
}
