//! Trade notification delivery

pub mod logger;
pub mod webhook;

pub use logger::LogNotifier;
pub use webhook::WebhookNotifier;

use crate::shared::errors::{NotifyError, ResolveError};
use crate::shared::types::{DeliveryTarget, TradeResult, UserId};
use async_trait::async_trait;

/// Final consumer of detected trades
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, result: &TradeResult, target: &DeliveryTarget) -> Result<(), NotifyError>;
}

/// Chat-side session used to turn persisted ids into messageable targets
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Resolves once the transport can resolve targets
    async fn wait_ready(&self);

    async fn resolve_direct(&self, user: &UserId) -> Result<DeliveryTarget, ResolveError>;

    async fn resolve_channel(&self, channel_id: &str) -> Result<DeliveryTarget, ResolveError>;
}
