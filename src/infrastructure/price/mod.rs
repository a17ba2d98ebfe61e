//! SOL spot price sources used to value trades in USDC

pub mod binance;

pub use binance::BinancePriceFeed;

use crate::shared::errors::PriceError;
use async_trait::async_trait;

/// Source of the SOL/USDC spot price
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    async fn sol_price(&self) -> Result<f64, PriceError>;
}

/// Constant price, for offline runs and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedPrice(pub f64);

#[async_trait]
impl SpotPriceSource for FixedPrice {
    async fn sol_price(&self) -> Result<f64, PriceError> {
        Ok(self.0)
    }
}
