//! Grapnel CLI - Command-line interface
//!
//! Provides command-line access to Grapnel functionality.

mod commands;

use clap::Parser;
use grapnel_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "grapnel")]
#[command(about = "A remote video fetch and remux service")]
struct Cli {
    /// Console log verbosity
    #[arg(long, global = true, default_value_t = CliLogLevel::Info)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_tracing_level(), None) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = commands::handle_command(cli.command).await {
        eprintln!("Error: {}", e.user_message());
        return Err(e.into());
    }

    Ok(())
}
