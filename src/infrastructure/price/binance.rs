use super::SpotPriceSource;
use crate::shared::config::PriceConfig;
use crate::shared::errors::PriceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Ticker response of `/api/v3/ticker/price`
#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: String,
}

/// Binance SOLUSDC ticker
pub struct BinancePriceFeed {
    http_client: Client,
    url: String,
}

impl BinancePriceFeed {
    pub fn new(config: &PriceConfig) -> Result<Self, PriceError> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PriceError::FeedUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
        })
    }
}

/// Parse the ticker body into a positive price
pub fn parse_ticker(body: &str) -> Result<f64, PriceError> {
    let ticker: TickerResponse =
        serde_json::from_str(body).map_err(|e| PriceError::InvalidPriceData(e.to_string()))?;
    let price: f64 = ticker
        .price
        .parse()
        .map_err(|_| PriceError::InvalidPriceData(format!("not a number: {}", ticker.price)))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::InvalidPriceData(format!("non-positive price {}", price)));
    }
    Ok(price)
}

#[async_trait]
impl SpotPriceSource for BinancePriceFeed {
    async fn sol_price(&self) -> Result<f64, PriceError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PriceError::FeedUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PriceError::FeedUnavailable(format!(
                "ticker request failed with status: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PriceError::FeedUnavailable(e.to_string()))?;
        let price = parse_ticker(&body)?;
        debug!("💱 SOL/USDC spot price: {}", price);
        Ok(price)
    }
}
