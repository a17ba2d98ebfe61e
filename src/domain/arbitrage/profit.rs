//! Realized profit and provider attribution for a detected trade

use super::provider::ProviderTable;
use super::reimbursement::Reimbursement;
use crate::domain::trade::{TokenBalance, TradeCandidate};
use crate::shared::config::AttributionConfig;
use crate::shared::types::TrackedAddress;
use crate::shared::utils::{lamport_delta_to_sol, raw_to_ui};
use tracing::warn;

/// Token holdings of one owner for one mint, summed across accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHolding {
    pub raw: u64,
    pub decimals: u8,
}

impl TokenHolding {
    fn sum(balances: &[TokenBalance], owner: &str, mint: &str) -> Option<Self> {
        balances
            .iter()
            .filter(|b| b.mint == mint && b.owner.as_deref() == Some(owner))
            .fold(None, |acc: Option<TokenHolding>, b| {
                Some(TokenHolding {
                    raw: acc.map(|h| h.raw).unwrap_or(0).saturating_add(b.amount),
                    decimals: b.decimals,
                })
            })
    }
}

/// Pre/post balances of the tracked wallet. Missing entries stay `None` here
/// and are read as zero through the accessor methods only.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSheet {
    pub pre_native: Option<u64>,
    pub post_native: Option<u64>,
    pub pre_wrapped: Option<TokenHolding>,
    pub post_wrapped: Option<TokenHolding>,
    pub pre_stable: Option<TokenHolding>,
    pub post_stable: Option<TokenHolding>,
}

impl BalanceSheet {
    pub fn for_owner(tx: &TradeCandidate, owner: &str, wrapped_mint: &str, stable_mint: &str) -> Self {
        let index = tx.account_index(owner);
        Self {
            pre_native: index.and_then(|i| tx.pre_balances.get(i).copied()),
            post_native: index.and_then(|i| tx.post_balances.get(i).copied()),
            pre_wrapped: TokenHolding::sum(&tx.pre_token_balances, owner, wrapped_mint),
            post_wrapped: TokenHolding::sum(&tx.post_token_balances, owner, wrapped_mint),
            pre_stable: TokenHolding::sum(&tx.pre_token_balances, owner, stable_mint),
            post_stable: TokenHolding::sum(&tx.post_token_balances, owner, stable_mint),
        }
    }

    fn ui(holding: Option<TokenHolding>) -> f64 {
        holding.map(|h| raw_to_ui(h.raw, h.decimals)).unwrap_or(0.0)
    }

    /// Change in native + wrapped SOL, in SOL
    pub fn sol_delta(&self) -> f64 {
        let native = self.post_native.unwrap_or(0) as i128 - self.pre_native.unwrap_or(0) as i128;
        lamport_delta_to_sol(native) + Self::ui(self.post_wrapped) - Self::ui(self.pre_wrapped)
    }

    pub fn stable_changed(&self) -> bool {
        match (self.pre_stable, self.post_stable) {
            (None, None) => false,
            (pre, post) => pre.map(|h| h.raw).unwrap_or(0) != post.map(|h| h.raw).unwrap_or(0),
        }
    }

    /// Change in stable-coin balance, in whole units
    pub fn stable_delta(&self) -> f64 {
        Self::ui(self.post_stable) - Self::ui(self.pre_stable)
    }
}

/// Attribution output; `sol_profit` and `usdc_profit` are never both set
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub sol_profit: Option<f64>,
    pub usdc_profit: Option<f64>,
    pub provider: String,
    pub is_flash_loan: bool,
    pub memo: Option<String>,
}

/// Computes profit, provider, flash-loan and memo for a classified trade
#[derive(Debug, Clone)]
pub struct ProfitAttributor {
    providers: ProviderTable,
    wrapped_mint: String,
    stable_mint: String,
    lending_programs: Vec<String>,
    fallback_provider: String,
}

impl ProfitAttributor {
    pub fn new(
        providers: ProviderTable,
        wrapped_mint: impl Into<String>,
        stable_mint: impl Into<String>,
        lending_programs: Vec<String>,
        fallback_provider: impl Into<String>,
    ) -> Self {
        Self {
            providers,
            wrapped_mint: wrapped_mint.into(),
            stable_mint: stable_mint.into(),
            lending_programs,
            fallback_provider: fallback_provider.into(),
        }
    }

    pub fn from_config(config: &AttributionConfig) -> Self {
        Self::new(
            ProviderTable::from_config(&config.providers),
            config.wrapped_sol_mint.clone(),
            config.usdc_mint.clone(),
            config.lending_programs.clone(),
            config.fallback_provider.clone(),
        )
    }

    pub fn balance_sheet(&self, tx: &TradeCandidate, address: &TrackedAddress) -> BalanceSheet {
        BalanceSheet::for_owner(tx, address.as_str(), &self.wrapped_mint, &self.stable_mint)
    }

    /// Provider from the static tip-account table
    pub fn static_provider<'a>(&'a self, tx: &TradeCandidate) -> Option<&'a str> {
        self.providers.match_transaction(tx)
    }

    pub fn is_flash_loan(&self, tx: &TradeCandidate) -> bool {
        tx.invokes_any(&self.lending_programs)
    }

    pub fn memo(tx: &TradeCandidate) -> Option<String> {
        tx.instructions.iter().find_map(|ix| ix.memo()).map(str::to_string)
    }

    /// Attribute a trade. `spot_price` (USDC per SOL) is only read when the
    /// stable-coin balance moved.
    pub fn attribute(
        &self,
        tx: &TradeCandidate,
        address: &TrackedAddress,
        reimbursement: Option<&Reimbursement>,
        spot_price: Option<f64>,
    ) -> Attribution {
        let sheet = self.balance_sheet(tx, address);
        let reimbursed_sol = reimbursement.map(Reimbursement::sol).unwrap_or(0.0);
        let sol_delta = sheet.sol_delta();

        let (sol_profit, usdc_profit) = if sheet.stable_changed() {
            let price = spot_price.unwrap_or_else(|| {
                warn!("No SOL price for {}, SOL leg counted as zero", tx.signature);
                0.0
            });
            // A negative sol_delta is SOL spent, so adding it subtracts the cost
            let usdc = sheet.stable_delta() + sol_delta * price + reimbursed_sol * price;
            (None, Some(usdc))
        } else {
            (Some(sol_delta + reimbursed_sol), None)
        };

        let provider = self
            .static_provider(tx)
            .map(str::to_string)
            .or_else(|| reimbursement.and_then(|r| r.provider.clone()))
            .unwrap_or_else(|| self.fallback_provider.clone());

        Attribution {
            sol_profit,
            usdc_profit,
            provider,
            is_flash_loan: self.is_flash_loan(tx),
            memo: Self::memo(tx),
        }
    }
}
