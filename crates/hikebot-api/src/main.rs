use anyhow::Context;
use clap::Parser;
use hikebot_api::Server;
use hikebot_core::ConfigManager;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "hikebot-api", version, about = "HikeBot REST API server")]
struct Args {
    /// Bind address; overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Bind port; overrides `server.port`
    #[arg(long)]
    port: Option<u16>,

    /// Explicit config file instead of ./hikebot.toml or ~/.hikebot/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a default config file to this path and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hikebot_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if let Some(path) = &args.init_config {
        ConfigManager::create_default_config(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let manager = match &args.config {
        Some(path) => ConfigManager::load_from(path)?,
        None => ConfigManager::load()?,
    };
    let mut config = manager.into_config();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let server = Server::new(addr, Arc::new(config)).await?;
    server.run().await?;
    Ok(())
}
