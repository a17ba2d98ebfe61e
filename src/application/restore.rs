//! Re-attaches persisted subscriptions after a restart

use super::tracker::TrackingService;
use crate::shared::config::RestoreConfig;
use crate::shared::errors::{ResolveError, RestoreError};
use crate::shared::types::PersistedSubscription;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

/// Totals of one restoration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub restored: usize,
    pub target_not_found: usize,
    pub recipient_not_found: usize,
    pub not_messageable: usize,
    pub subscribe_failed: usize,
    pub batches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemOutcome {
    Restored,
    Unresolved(ResolveError),
    SubscribeFailed,
}

impl RestoreStats {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Restored => self.restored += 1,
            ItemOutcome::Unresolved(ResolveError::TargetNotFound(_)) => self.target_not_found += 1,
            ItemOutcome::Unresolved(ResolveError::RecipientNotFound(_)) => self.recipient_not_found += 1,
            ItemOutcome::Unresolved(ResolveError::NotMessageable(_)) => self.not_messageable += 1,
            ItemOutcome::SubscribeFailed => self.subscribe_failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.target_not_found + self.recipient_not_found + self.not_messageable + self.subscribe_failed
    }
}

/// Batches persisted subscriptions back through the tracking service
pub struct RestorationOrchestrator {
    tracker: Arc<TrackingService>,
    batch_size: usize,
    batch_delay: Duration,
    ready_timeout: Duration,
}

impl RestorationOrchestrator {
    pub fn new(tracker: Arc<TrackingService>, config: &RestoreConfig) -> Self {
        Self {
            tracker,
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            ready_timeout: Duration::from_millis(config.ready_timeout_ms),
        }
    }

    /// Load every persisted subscription from the store and restore it
    pub async fn restore_from_store(&self) -> Result<RestoreStats, RestoreError> {
        let persisted = self.tracker.store().list_all_subscriptions().await?;
        self.restore_all(persisted).await
    }

    pub async fn restore_all(&self, persisted: Vec<PersistedSubscription>) -> Result<RestoreStats, RestoreError> {
        if timeout(self.ready_timeout, self.tracker.transport().wait_ready())
            .await
            .is_err()
        {
            error!("Delivery transport not ready after {:?}", self.ready_timeout);
            return Err(RestoreError::TransportNotReady(self.ready_timeout.as_millis() as u64));
        }

        info!("🔄 Restoring {} subscriptions", persisted.len());
        let mut stats = RestoreStats::default();

        let batches: Vec<&[PersistedSubscription]> = persisted.chunks(self.batch_size).collect();
        for (index, batch) in batches.iter().enumerate() {
            let outcomes = join_all(batch.iter().map(|item| self.restore_one(item))).await;
            outcomes.into_iter().for_each(|outcome| stats.record(outcome));
            stats.batches += 1;

            info!("Restored batch {}/{} ({} items)", index + 1, batches.len(), batch.len());
            if index + 1 < batches.len() {
                sleep(self.batch_delay).await;
            }
        }

        info!(
            "✅ Restoration complete: {} restored, {} channel not found, {} recipient not found, {} not messageable, {} subscribe failures",
            stats.restored,
            stats.target_not_found,
            stats.recipient_not_found,
            stats.not_messageable,
            stats.subscribe_failed
        );
        Ok(stats)
    }

    async fn restore_one(&self, item: &PersistedSubscription) -> ItemOutcome {
        let transport = self.tracker.transport();
        let resolved = match (&item.channel_id, item.is_direct_message) {
            (Some(channel), false) => transport.resolve_channel(channel).await,
            (None, false) => Err(ResolveError::TargetNotFound(format!("<none for {}>", item.user_id))),
            (_, true) => transport.resolve_direct(&item.user_id).await,
        };

        let target = match resolved {
            Ok(target) => target,
            Err(e) => {
                warn!("Skipping {} on {}: {}", item.user_id, item.address, e);
                return ItemOutcome::Unresolved(e);
            }
        };

        let handle = match self.tracker.attach(&item.address, &item.user_id, target).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to resubscribe {} for {}: {}", item.address, item.user_id, e);
                return ItemOutcome::SubscribeFailed;
            }
        };

        if let Err(e) = self.tracker.store().update_push_handle(&item.address, handle).await {
            warn!("Failed to store push handle for {}: {}", item.address, e);
        }
        ItemOutcome::Restored
    }
}
