//! Arbwatch - Solana arbitrage trade watcher
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use application::{RestorationOrchestrator, TradeAnalyzer, TrackingService};
pub use domain::arbitrage::{ArbitrageClassifier, ProfitAttributor};
pub use domain::subscription::SubscriptionRegistry;
pub use infrastructure::blockchain::{ChainClient, SolanaChainClient};
