//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

/// A wallet address being watched for trades
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedAddress(String);

impl TrackedAddress {
    /// Parse and validate a base58 Solana public key
    pub fn parse(address: &str) -> Option<Self> {
        let trimmed = address.trim();
        Pubkey::from_str(trimmed).ok().map(|_| Self(trimmed.to_string()))
    }

    /// Wrap an address without validation (addresses coming back from the chain)
    pub fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn pubkey(&self) -> Option<Pubkey> {
        Pubkey::from_str(&self.0).ok()
    }
}

impl fmt::Display for TrackedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat platform user id of a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque id of a chain-level account subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushHandle(pub u64);

impl fmt::Display for PushHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Subscription row as kept by the persistent store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSubscription {
    pub user_id: UserId,
    pub address: TrackedAddress,
    /// Shared channel to post into; `None` for direct-message tracking
    pub channel_id: Option<String>,
    pub is_direct_message: bool,
    pub tracking_start: DateTime<Utc>,
}

impl PersistedSubscription {
    pub fn new(user_id: UserId, address: TrackedAddress, channel_id: Option<String>) -> Self {
        Self {
            user_id,
            address,
            is_direct_message: channel_id.is_none(),
            channel_id,
            tracking_start: Utc::now(),
        }
    }
}

/// Where a notification goes on the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Direct(UserId),
    Channel(String),
}

/// A resolved, messageable delivery target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub route: Route,
    pub endpoint: String,
}

impl DeliveryTarget {
    pub fn new(route: Route, endpoint: impl Into<String>) -> Self {
        Self {
            route,
            endpoint: endpoint.into(),
        }
    }
}

/// Structured result of one detected arbitrage trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    pub address: TrackedAddress,
    pub signature: String,
    /// Native SOL balance in lamports
    pub sol_balance: u64,
    /// Wrapped SOL balance in whole units
    pub wrapped_sol_balance: f64,
    pub usdc_balance: Option<f64>,
    pub sol_profit: Option<f64>,
    pub usdc_profit: Option<f64>,
    pub provider: String,
    pub is_flash_loan: bool,
    pub memo: Option<String>,
    pub slot: u64,
    pub block_time: Option<i64>,
}
