//! xbmc-remote - Command-line remote control for XBMC/Kodi
//!
//! Sends JSON-RPC commands to a media center and wakes it with Wake-on-LAN.

mod commands;
mod config;
mod network;
mod protocol;
mod wol;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Action, Command, RemoteCall, WakeTarget};
use config::{Config, RemoteConfig};
use network::RpcChannel;
use protocol::RpcValue;

/// xbmc-remote - Remote control for XBMC/Kodi media centers
#[derive(Parser)]
#[command(name = "xbmc")]
#[command(author = "xbmc-remote Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Send commands to an XBMC/Kodi media center", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Remote(Command),

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()
    };

    match cli.command {
        Commands::Remote(command) => {
            run_command(&config, command).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                if let Some(path) = output {
                    config::sample_config().save(&path)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", config::generate_sample_config()?);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Resolve a command against the configuration and carry it out
async fn run_command(config: &Config, command: Command) -> anyhow::Result<()> {
    let name = command.name();
    tracing::info!("Sending {}", name);

    match command.resolve(config)? {
        Action::Rpc(call) => {
            let result = call_remote(&config.remote, call)
                .await
                .with_context(|| format!("'{}' failed", name))?;
            println!("{}", result);
        }
        Action::Wake(target) => {
            wake(&target)
                .await
                .with_context(|| format!("Could not wake {}", target.mac_addr))?;
            println!(
                "Magic packet sent to {}:{} for {}",
                target.broadcast_address, target.broadcast_port, target.mac_addr
            );
        }
    }

    Ok(())
}

/// Make one call on a fresh connection, closing it whatever the outcome
async fn call_remote(remote: &RemoteConfig, call: RemoteCall) -> anyhow::Result<RpcValue> {
    let mut channel = RpcChannel::connect(&remote.host, remote.port, &remote.network_config()).await?;
    let result = channel.invoke(call.method, call.params).await;
    channel.close().await;
    Ok(result?)
}

async fn wake(target: &WakeTarget) -> anyhow::Result<()> {
    wol::send_magic_packet(
        &target.mac_addr,
        &target.broadcast_address,
        &target.broadcast_port,
    )
    .await?;
    Ok(())
}
