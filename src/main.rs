//! IRC Relay - Main binary

use clap::{Parser, Subcommand};
use ircrelay_core::{print_validation_result, Config, ConfigValidator, Relay, TcpConnector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// IRC Relay - Mirrors one channel across several IRC networks
#[derive(Parser)]
#[command(name = "ircrelay")]
#[command(about = "Relay a channel across IRC networks")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Test configuration and exit
    #[arg(long)]
    test_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "relay.toml")]
        output: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if let Some(command) = cli.command {
        match command {
            Commands::Config { output } => {
                generate_config(&output)?;
                return Ok(());
            }
            Commands::Version => {
                show_version();
                return Ok(());
            }
        }
    }

    info!("Loading configuration from {:?}", cli.config);
    let config = Config::from_file(&cli.config)?;

    if cli.test_config {
        let result = ConfigValidator::new(config).validate();
        print_validation_result(&result);
        if !result.is_valid {
            anyhow::bail!("configuration is invalid");
        }
        return Ok(());
    }

    let relay = Relay::new(&config, Arc::new(TcpConnector::new()))?;

    info!("Starting relay across {} networks...", config.networks.len());
    tokio::select! {
        reports = relay.run() => {
            for report in &reports {
                if !report.is_clean() {
                    warn!("[{}] {:?}", report.network, report.outcome);
                }
            }
            if reports.iter().all(|r| !r.is_clean()) {
                error!("No session ended cleanly");
                anyhow::bail!("all sessions failed");
            }
            info!("All sessions closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

/// Initialize logging
fn init_logging(level: &str) -> anyhow::Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    Ok(())
}

/// Generate default configuration file
fn generate_config(output: &PathBuf) -> anyhow::Result<()> {
    let config = Config::default();
    config.to_file(output)?;
    println!("Generated default configuration file: {:?}", output);
    Ok(())
}

/// Show version information
fn show_version() {
    println!("ircrelay {}", env!("CARGO_PKG_VERSION"));
}
