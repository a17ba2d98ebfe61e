//! Chain node boundary used by the ingestion pipeline

use crate::domain::trade::TradeCandidate;
use crate::shared::errors::ChainError;
use crate::shared::types::{PushHandle, TrackedAddress};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Push event: the account state of `address` changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNotification {
    pub address: TrackedAddress,
    pub slot: u64,
}

/// Read-only view of a Solana node plus account-change push subscriptions
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Start forwarding account changes of `address` into `notifications`
    async fn subscribe_to_address_changes(
        &self,
        address: &TrackedAddress,
        notifications: mpsc::UnboundedSender<AccountNotification>,
    ) -> Result<PushHandle, ChainError>;

    async fn unsubscribe(&self, handle: PushHandle) -> Result<(), ChainError>;

    /// Most recent signatures touching `address`, newest first
    async fn recent_signatures(&self, address: &TrackedAddress, limit: usize) -> Result<Vec<String>, ChainError>;

    /// Parsed transaction with metadata; `None` when not available yet
    async fn fetch_parsed_transaction(&self, signature: &str) -> Result<Option<TradeCandidate>, ChainError>;

    /// Native balance in lamports
    async fn get_balance(&self, address: &TrackedAddress) -> Result<u64, ChainError>;

    /// Balance of the owner's associated token account for `mint`, 0 if it does not exist
    async fn token_balance(&self, owner: &TrackedAddress, mint: &str) -> Result<f64, ChainError>;
}
