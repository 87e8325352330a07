use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

fn main() {
    // Logs go to stderr so command output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vertebra=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Route(args) => commands::route::run(args, cli.format),
        Commands::Reconcile(args) => commands::reconcile::run(args, cli.format),
        Commands::Request(args) => commands::request::run(args, cli.format),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
