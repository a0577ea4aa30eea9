//! Quarry CLI - list the repositories of a Bitbucket Cloud connection.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::commands::list::ListArgs;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(version)]
#[command(about = "List the repositories of a Bitbucket Cloud connection")]
#[command(after_long_help = r#"EXAMPLES
    List every repository you are a member of:
        $ quarry list

    Include a team's repositories and print JSON:
        $ quarry list --team acme --output json

CONFIGURATION
    Quarry reads configuration from:
      1. ~/.config/quarry/config.toml (or $XDG_CONFIG_HOME/quarry/config.toml)
      2. ./quarry.toml
      3. Environment variables (QUARRY_ prefix, e.g., QUARRY_BITBUCKET__USERNAME)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    QUARRY_BITBUCKET__USERNAME        Bitbucket username
    QUARRY_BITBUCKET__APP_PASSWORD    Bitbucket app password
    QUARRY_BITBUCKET__TEAMS           Comma-separated teams to list
    RUST_LOG                          Log filter (default: quarry=info,quarry_cli=info)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories of the configured connection
    List(ListArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("quarry=info,quarry_cli=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cancel = CancellationToken::new();
    shutdown::setup_shutdown_handler(cancel.clone());

    match cli.command {
        Commands::List(args) => commands::list::handle_list(args, config, cancel).await,
    }
}
