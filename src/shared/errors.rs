//! Error handling for the application

use thiserror::Error;

/// Chain node errors (RPC + pubsub)
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Unknown push handle: {0}")]
    UnknownHandle(u64),
}

/// Persistent subscription store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Delivery target resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Channel not found: {0}")]
    TargetNotFound(String),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Channel {0} is not a text channel")]
    NotMessageable(String),
}

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Endpoint rejected notification with status {0}")]
    Rejected(u16),
}

/// Spot price feed errors
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("Price feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Invalid price data: {0}")]
    InvalidPriceData(String),
}

/// Restoration errors
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Notification transport not ready after {0}ms")]
    TransportNotReady(u64),

    #[error("Failed to load persisted subscriptions: {0}")]
    Store(#[from] StoreError),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid Solana wallet address: {0}")]
    InvalidAddress(String),

    #[error("Blockchain error: {0}")]
    Blockchain(#[from] ChainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Delivery target error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
