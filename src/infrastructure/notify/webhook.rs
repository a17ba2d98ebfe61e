use super::{DeliveryTransport, NotificationSink};
use crate::shared::config::NotifyConfig;
use crate::shared::errors::{NotifyError, ResolveError};
use crate::shared::types::{DeliveryTarget, Route, TradeResult, UserId};
use crate::shared::utils::{lamports_to_sol, solscan_url};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Posts each trade as JSON to the webhook configured for its target
pub struct WebhookNotifier {
    http_client: Client,
    channels: HashMap<String, String>,
    direct: HashMap<String, String>,
}

impl WebhookNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            http_client: Client::new(),
            channels: config.channels.clone(),
            direct: config.direct.clone(),
        }
    }
}

fn is_postable(endpoint: &str) -> bool {
    endpoint.starts_with("https://") || endpoint.starts_with("http://")
}

/// JSON body sent for one trade
pub fn payload(result: &TradeResult, target: &DeliveryTarget) -> Value {
    let (route, recipient) = match &target.route {
        Route::Direct(user) => ("direct", user.to_string()),
        Route::Channel(channel) => ("channel", channel.clone()),
    };

    json!({
        "route": route,
        "recipient": recipient,
        "trade": result,
        "sol_balance_sol": lamports_to_sol(result.sol_balance),
        "solscan": solscan_url(&result.signature),
    })
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn deliver(&self, result: &TradeResult, target: &DeliveryTarget) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .post(&target.endpoint)
            .json(&payload(result, target))
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Webhook for {:?} answered {}", target.route, status);
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        debug!("📨 Delivered {} to {:?}", result.signature, target.route);
        Ok(())
    }
}

#[async_trait]
impl DeliveryTransport for WebhookNotifier {
    async fn wait_ready(&self) {}

    async fn resolve_direct(&self, user: &UserId) -> Result<DeliveryTarget, ResolveError> {
        let endpoint = self
            .direct
            .get(user.as_str())
            .ok_or_else(|| ResolveError::RecipientNotFound(user.to_string()))?;
        Ok(DeliveryTarget::new(Route::Direct(user.clone()), endpoint.clone()))
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<DeliveryTarget, ResolveError> {
        let endpoint = self
            .channels
            .get(channel_id)
            .ok_or_else(|| ResolveError::TargetNotFound(channel_id.to_string()))?;
        if !is_postable(endpoint) {
            return Err(ResolveError::NotMessageable(channel_id.to_string()));
        }
        Ok(DeliveryTarget::new(Route::Channel(channel_id.to_string()), endpoint.clone()))
    }
}
