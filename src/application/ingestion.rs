//! Push-driven trade ingestion, one watcher task per tracked address

use super::analyzer::TradeAnalyzer;
use crate::domain::arbitrage::ArbitrageClassifier;
use crate::domain::subscription::SubscriptionRegistry;
use crate::domain::trade::ProcessedSignatureLedger;
use crate::infrastructure::blockchain::{AccountNotification, ChainClient};
use crate::infrastructure::notify::NotificationSink;
use crate::shared::types::{DeliveryTarget, PushHandle, TrackedAddress, TradeResult, UserId};
use crate::shared::utils::solscan_url;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Resolved delivery target of every active subscriber
pub type Recipients = DashMap<UserId, DeliveryTarget>;

/// Collaborators shared by all ingestors
pub struct IngestPipeline {
    pub chain: Arc<dyn ChainClient>,
    pub classifier: ArbitrageClassifier,
    pub analyzer: TradeAnalyzer,
    pub registry: Arc<SubscriptionRegistry>,
    pub recipients: Arc<Recipients>,
    pub sink: Arc<dyn NotificationSink>,
    /// Signatures fetched per notification
    pub lookback: usize,
    pub ledger_capacity: usize,
}

/// What one notification produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// New signatures considered, oldest first
    pub considered: Vec<String>,
    /// Left unmarked because the transaction could not be fetched
    pub deferred: usize,
    pub trades: usize,
    pub delivered: usize,
}

/// Per-address ingestion state
pub struct TradeIngestor {
    address: TrackedAddress,
    ledger: ProcessedSignatureLedger,
    pipeline: Arc<IngestPipeline>,
}

impl TradeIngestor {
    pub fn new(address: TrackedAddress, pipeline: Arc<IngestPipeline>) -> Self {
        Self {
            ledger: ProcessedSignatureLedger::new(pipeline.ledger_capacity),
            address,
            pipeline,
        }
    }

    pub fn address(&self) -> &TrackedAddress {
        &self.address
    }

    pub fn ledger(&self) -> &ProcessedSignatureLedger {
        &self.ledger
    }

    /// Fetch, dedupe, classify and deliver everything new since the last call
    pub async fn handle_notification(&mut self, notification: &AccountNotification) -> IngestReport {
        let mut report = IngestReport::default();
        debug!("🔔 Account change for {} at slot {}", self.address, notification.slot);

        let signatures = match self
            .pipeline
            .chain
            .recent_signatures(&self.address, self.pipeline.lookback)
            .await
        {
            Ok(signatures) => signatures,
            Err(e) => {
                warn!("Failed to fetch signatures for {}: {}", self.address, e);
                return report;
            }
        };

        // Newest first from the node; process oldest first
        report.considered = signatures
            .into_iter()
            .filter(|signature| !self.ledger.contains(signature))
            .rev()
            .collect();

        for signature in &report.considered {
            let tx = match self.pipeline.chain.fetch_parsed_transaction(signature).await {
                Ok(Some(tx)) => tx,
                Ok(None) => {
                    debug!("Transaction {} not available yet", signature);
                    report.deferred += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Failed to fetch transaction {}: {}", signature, e);
                    report.deferred += 1;
                    continue;
                }
            };

            self.ledger.mark_processed(signature);

            if !self.pipeline.classifier.is_arbitrage(&tx) {
                continue;
            }

            report.trades += 1;
            let result = self.pipeline.analyzer.analyze(&tx, &self.address).await;
            info!(
                "🎯 Arbitrage detected for {} via {}: {}",
                self.address,
                result.provider,
                solscan_url(signature)
            );
            report.delivered += self.fan_out(&result).await;
        }

        report
    }

    async fn fan_out(&self, result: &TradeResult) -> usize {
        let mut delivered = 0;
        for user in self.pipeline.registry.subscribers(&self.address) {
            // Clone out so the map shard is not held across the await
            let target = self.pipeline.recipients.get(&user).map(|entry| entry.value().clone());
            let Some(target) = target else {
                warn!("No delivery target for {} on {}", user, self.address);
                continue;
            };

            match self.pipeline.sink.deliver(result, &target).await {
                Ok(()) => delivered += 1,
                Err(e) => error!("Failed to notify {} about {}: {}", user, result.signature, e),
            }
        }
        delivered
    }
}

/// Handed back by a watcher once the chain side of its channel is gone
pub struct ClosedStream {
    pub handle: PushHandle,
    /// Carries the ledger over to a replacement watcher
    pub ingestor: TradeIngestor,
}

/// Drains one address's notification channel so its ingestor is never shared
pub struct AddressWatcher;

impl AddressWatcher {
    pub fn spawn(
        handle: PushHandle,
        mut ingestor: TradeIngestor,
        mut notifications: mpsc::UnboundedReceiver<AccountNotification>,
        closed: mpsc::UnboundedSender<ClosedStream>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(mut notification) = notifications.recv().await {
                // Pushes that piled up during the last pass are covered by one fetch
                while let Ok(newer) = notifications.try_recv() {
                    notification = newer;
                }
                ingestor.handle_notification(&notification).await;
            }

            debug!("Stream {} for {} closed", handle, ingestor.address());
            let _ = closed.send(ClosedStream { handle, ingestor });
        })
    }
}
