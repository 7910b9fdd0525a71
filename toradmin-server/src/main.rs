#![cfg_attr(not(test), forbid(unsafe_code))]

//! Entry point of the `toradmin-server` binary.

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::server::Config;
use toradmin_server::server;

#[derive(Parser)]
#[command(name = "toradmin-server")]
#[command(about = "Web control panel for a local tor daemon", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind, overriding the config file and TORADMIN_PORT
        #[arg(long, short)]
        port: Option<u16>,

        /// Configuration file (.yaml, .yml, .json or .toml)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

/// Loads `.env` and parses the command line.
#[must_use]
pub fn initialize_cli() -> Cli {
    dotenv().ok();
    Cli::parse()
}

/// Resolves the configuration and runs the server until shutdown.
///
/// # Errors
/// Returns an error if configuration loading or server startup fails.
pub async fn handle_serve_command(
    port: Option<u16>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let resolved_config = Config::load_config(config.as_deref(), port)?;
    server::run(resolved_config).await
}

/// # Errors
/// Returns an error if the application fails to initialize or run.
pub async fn run_app() -> Result<(), Box<dyn Error>> {
    match initialize_cli().command {
        Commands::Serve { port, config } => handle_serve_command(port, config).await,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run_app().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_accepts_optional_port_and_config() {
        let cli = Cli::try_parse_from(["toradmin-server", "serve", "--port", "9000", "-c", "a.yaml"])
            .unwrap();
        let Commands::Serve { port, config } = cli.command;
        assert_eq!(port, Some(9000));
        assert_eq!(config, Some(PathBuf::from("a.yaml")));

        let cli = Cli::try_parse_from(["toradmin-server", "serve"]).unwrap();
        let Commands::Serve { port, config } = cli.command;
        assert_eq!(port, None);
        assert_eq!(config, None);
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["toradmin-server", "launch"]).is_err());
    }
}
