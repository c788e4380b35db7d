use clap::Parser;
use tracing_subscriber::EnvFilter;

use stackscout_cli::cli::{Cli, Commands};
use stackscout_cli::commands;
use stackscout_cli::error::CliError;
use stackscout_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stdout carries command output, logs go to stderr
    let filter = cli
        .log_level
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        use colored::Colorize;

        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    tracing::debug!(config = %cli.config.display(), "stackscout-cli starting");

    match cli.command {
        Commands::Collect(args) => commands::collect::execute(args, &cli.config, &writer).await,
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
