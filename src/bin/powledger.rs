#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use colored::*;
use powledger::config::{load_config, load_config_from, Config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Single-node proof-of-work ledger", long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./powledger.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the faucet, transfer and mining walkthrough
    Demo,
    /// Starts the interactive shell
    Shell,
    /// Serves the HTTP API
    Serve {
        /// Port to listen on, overriding the config file
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Commands::Demo => {
            powledger::cli::run_demo(&config)?;
        }
        Commands::Shell => powledger::cli::run_shell(&config)?,
        Commands::Serve { port } => serve(config, port)?,
    }

    Ok(())
}

#[cfg(feature = "api")]
fn serve(config: Config, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    use powledger::api::{run_api_server, ApiState};
    use powledger::cli::DEFAULT_WALLETS;
    use powledger::node::LedgerService;
    use powledger::wallet::WalletRegistry;

    let port = port.unwrap_or(config.api.port);
    let state = ApiState::new(
        LedgerService::from_config(&config),
        WalletRegistry::with_wallets(DEFAULT_WALLETS)?,
    );

    println!(
        "{}",
        format!("powledger API on http://0.0.0.0:{}/api", port).bright_cyan()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_api_server(state, port))
}

#[cfg(not(feature = "api"))]
fn serve(_config: Config, _port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("{}", "API feature not enabled in this build".red());
    Err("API feature not enabled in this build".into())
}
