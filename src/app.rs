// src/app.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use arbwatch::application::{
    Command, CommandExecutor, IngestPipeline, Recipients, RestorationOrchestrator, TradeAnalyzer, TrackingService,
};
use arbwatch::domain::arbitrage::{strategy_from_config, ArbitrageClassifier, ProfitAttributor};
use arbwatch::domain::subscription::SubscriptionRegistry;
use arbwatch::infrastructure::blockchain::{ChainClient, SolanaChainClient};
use arbwatch::infrastructure::notify::{DeliveryTransport, LogNotifier, NotificationSink, WebhookNotifier};
use arbwatch::infrastructure::price::{BinancePriceFeed, SpotPriceSource};
use arbwatch::infrastructure::store::{JsonFileStore, SubscriptionStore};
use arbwatch::shared::config::BotConfig;

/// Wire everything up, restore persisted subscriptions and serve stdin commands
pub async fn run(config: BotConfig) -> Result<()> {
    info!("🚀 Starting arbwatch");
    info!("🔗 RPC: {}", config.network.rpc_url);

    let ws_url = config.network.websocket_url();
    let chain: Arc<dyn ChainClient> = Arc::new(
        SolanaChainClient::connect(&config.network.rpc_url, &ws_url, &config.network.commitment)
            .await
            .context("connecting to Solana")?,
    );

    let store: Arc<dyn SubscriptionStore> = Arc::new(
        JsonFileStore::open(&config.store.path)
            .await
            .with_context(|| format!("opening store {}", config.store.path))?,
    );

    let (sink, transport): (Arc<dyn NotificationSink>, Arc<dyn DeliveryTransport>) = if config.notify.log_only {
        info!("📝 Notifications go to the log only");
        let sink: Arc<dyn NotificationSink> = Arc::new(LogNotifier);
        let transport: Arc<dyn DeliveryTransport> = Arc::new(LogNotifier);
        (sink, transport)
    } else {
        let webhook = Arc::new(WebhookNotifier::new(&config.notify));
        let sink: Arc<dyn NotificationSink> = webhook.clone();
        let transport: Arc<dyn DeliveryTransport> = webhook;
        (sink, transport)
    };

    let price: Arc<dyn SpotPriceSource> = Arc::new(BinancePriceFeed::new(&config.price)?);
    let attribution = &config.attribution;
    let reimbursement = strategy_from_config(&attribution.reimbursement, chain.clone());
    info!("💸 Reimbursement strategy: {}", reimbursement.name());
    let analyzer = TradeAnalyzer::new(
        chain.clone(),
        ProfitAttributor::from_config(attribution),
        reimbursement,
        price,
        attribution.wrapped_sol_mint.clone(),
        attribution.usdc_mint.clone(),
    );

    let pipeline = Arc::new(IngestPipeline {
        chain: chain.clone(),
        classifier: ArbitrageClassifier::new(config.classifier.programs.clone()),
        analyzer,
        registry: Arc::new(SubscriptionRegistry::new()),
        recipients: Arc::new(Recipients::new()),
        sink,
        lookback: config.ingest.signature_lookback,
        ledger_capacity: config.ingest.ledger_capacity,
    });

    let tracker = Arc::new(TrackingService::new(pipeline, store, transport, &config.ingest));
    let recovery = tokio::spawn(tracker.clone().recover_closed_streams());

    let restorer = RestorationOrchestrator::new(tracker.clone(), &config.restore);
    match restorer.restore_from_store().await {
        Ok(stats) => info!("🔄 {} subscriptions restored in {} batches", stats.restored, stats.batches),
        Err(e) => error!("❌ Restoration failed: {}", e),
    }

    let executor = CommandExecutor::new(tracker.clone());
    info!("⌨️  Ready: track <user> <address> [channel] | untrack <user> | status");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Ctrl-C received");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&executor, &line).await,
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    }

    recovery.abort();
    tracker.shutdown().await;
    info!("👋 arbwatch stopped");
    Ok(())
}

async fn handle_line(executor: &CommandExecutor, line: &str) {
    let command = match Command::parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(e) => {
            warn!("Unrecognised command '{}': {}", line.trim(), e.kind());
            println!("usage: track <user> <address> [channel] | untrack <user> | status");
            return;
        }
    };

    match executor.execute(command).await {
        Ok(reply) => println!("{}", reply),
        Err(e) => {
            warn!("Command failed: {}", e);
            println!("error: {}", e);
        }
    }
}
