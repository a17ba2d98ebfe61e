use super::{DeliveryTransport, NotificationSink};
use crate::shared::errors::{NotifyError, ResolveError};
use crate::shared::types::{DeliveryTarget, Route, TradeResult, UserId};
use crate::shared::utils::{format_block_time, lamports_to_sol, solscan_url};
use async_trait::async_trait;
use tracing::info;

/// Writes trades to the log; every target resolves
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn deliver(&self, result: &TradeResult, target: &DeliveryTarget) -> Result<(), NotifyError> {
        let profit = match (result.sol_profit, result.usdc_profit) {
            (Some(sol), _) => format!("{:+.6} SOL", sol),
            (None, Some(usdc)) => format!("{:+.2} USDC", usdc),
            (None, None) => "n/a".to_string(),
        };

        info!(
            "💰 Arbitrage by {} -> {:?}: profit {} via {}{} | balance {:.4} SOL, {:.4} wSOL{} | {} | {}",
            result.address,
            target.route,
            profit,
            result.provider,
            if result.is_flash_loan { " (flash loan)" } else { "" },
            lamports_to_sol(result.sol_balance),
            result.wrapped_sol_balance,
            result
                .usdc_balance
                .map(|usdc| format!(", {:.2} USDC", usdc))
                .unwrap_or_default(),
            format_block_time(result.block_time),
            solscan_url(&result.signature),
        );
        if let Some(memo) = &result.memo {
            info!("📝 Memo: {}", memo);
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryTransport for LogNotifier {
    async fn wait_ready(&self) {}

    async fn resolve_direct(&self, user: &UserId) -> Result<DeliveryTarget, ResolveError> {
        Ok(DeliveryTarget::new(Route::Direct(user.clone()), "log"))
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<DeliveryTarget, ResolveError> {
        Ok(DeliveryTarget::new(Route::Channel(channel_id.to_string()), "log"))
    }
}
