//! Binary entrypoint: CLI parsing, logging setup, and server startup.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use markstash::config::Config;
use markstash::gateway;

#[derive(Parser)]
#[command(name = "markstash", version, about = "Self-hosted bookmark service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Bind host; overrides the config file.
        #[arg(long)]
        host: Option<String>,
        /// Bind port; overrides the config file.
        #[arg(long)]
        port: Option<u16>,
        /// Path to a config file (defaults to the platform config dir).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { host, port, config } => {
            let config = Config::load(config.as_deref())?;
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, config).await
        }
    }
}
