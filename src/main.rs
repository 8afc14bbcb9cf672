use clap::Parser;
use std::process;
use tfstaticregistry::app_constants::log::DEFAULT_LOG_LEVEL;
use tfstaticregistry::cli::{Cli, CommandHandler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { DEFAULT_LOG_LEVEL };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = CommandHandler::handle_command(cli.command).await {
        eprintln!("Error: {}", e.user_message());
        process::exit(1);
    }
}
