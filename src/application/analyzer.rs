//! Turns a classified trade into a `TradeResult`

use crate::domain::arbitrage::{ProfitAttributor, Reimbursement, ReimbursementStrategy};
use crate::domain::trade::TradeCandidate;
use crate::infrastructure::blockchain::ChainClient;
use crate::infrastructure::price::SpotPriceSource;
use crate::shared::types::{TrackedAddress, TradeResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Combines attribution, reimbursement lookup, spot price and live balances
pub struct TradeAnalyzer {
    chain: Arc<dyn ChainClient>,
    attributor: ProfitAttributor,
    reimbursement: Arc<dyn ReimbursementStrategy>,
    price: Arc<dyn SpotPriceSource>,
    wrapped_mint: String,
    stable_mint: String,
}

impl TradeAnalyzer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        attributor: ProfitAttributor,
        reimbursement: Arc<dyn ReimbursementStrategy>,
        price: Arc<dyn SpotPriceSource>,
        wrapped_mint: impl Into<String>,
        stable_mint: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            attributor,
            reimbursement,
            price,
            wrapped_mint: wrapped_mint.into(),
            stable_mint: stable_mint.into(),
        }
    }

    pub async fn analyze(&self, tx: &TradeCandidate, address: &TrackedAddress) -> TradeResult {
        // Only look for a refund when no tip account matched
        let reimbursement: Option<Reimbursement> = match self.attributor.static_provider(tx) {
            Some(provider) => {
                debug!("Provider {} matched statically for {}", provider, tx.signature);
                None
            }
            None => self.reimbursement.find(tx, address).await,
        };

        let spot_price = if self.attributor.balance_sheet(tx, address).stable_changed() {
            match self.price.sol_price().await {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("Failed to fetch SOL price for {}: {}", tx.signature, e);
                    None
                }
            }
        } else {
            None
        };

        let attribution = self
            .attributor
            .attribute(tx, address, reimbursement.as_ref(), spot_price);

        let sol_balance = self.chain.get_balance(address).await.unwrap_or_else(|e| {
            warn!("Failed to get SOL balance of {}: {}", address, e);
            0
        });
        let wrapped_sol_balance = self
            .chain
            .token_balance(address, &self.wrapped_mint)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to get wSOL balance of {}: {}", address, e);
                0.0
            });
        let usdc_balance = match self.chain.token_balance(address, &self.stable_mint).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Failed to get USDC balance of {}: {}", address, e);
                None
            }
        };

        TradeResult {
            address: address.clone(),
            signature: tx.signature.clone(),
            sol_balance,
            wrapped_sol_balance,
            usdc_balance,
            sol_profit: attribution.sol_profit,
            usdc_profit: attribution.usdc_profit,
            provider: attribution.provider,
            is_flash_loan: attribution.is_flash_loan,
            memo: attribution.memo,
            slot: tx.slot,
            block_time: tx.block_time,
        }
    }
}
