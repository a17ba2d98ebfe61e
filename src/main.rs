mod app;

use anyhow::{Context, Result};
use arbwatch::shared::config::{BotConfig, ConfigLoader};
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "Config.toml";

#[derive(Parser, Debug)]
#[command(version, about = "Watches Solana wallets for arbitrage trades and pushes notifications")]
struct Args {
    /// Path to config file (defaults to Config.toml when present)
    #[arg(long)]
    config: Option<String>,

    /// RPC endpoint URL (overrides config)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Websocket endpoint URL (overrides config)
    #[arg(long)]
    ws_url: Option<String>,

    /// Subscription store file (overrides config)
    #[arg(long)]
    store: Option<String>,
}

fn load_config(args: &Args) -> Result<BotConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_config(path).with_context(|| format!("loading {}", path))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            ConfigLoader::load_config(DEFAULT_CONFIG).with_context(|| format!("loading {}", DEFAULT_CONFIG))?
        }
        None => {
            info!("No {} found, using defaults", DEFAULT_CONFIG);
            BotConfig::default()
        }
    };

    // CLI has higher priority than the config file
    if let Some(rpc_url) = &args.rpc_url {
        config.network.rpc_url = rpc_url.clone();
    }
    if let Some(ws_url) = &args.ws_url {
        config.network.ws_url = Some(ws_url.clone());
    }
    if let Some(store) = &args.store {
        config.store.path = store.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let config = load_config(&args)?;
    app::run(config).await
}
