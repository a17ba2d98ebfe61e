//! Arbitrage domain - trade classification and profit attribution

pub mod classifier;
pub mod profit;
pub mod provider;
pub mod reimbursement;

pub use classifier::ArbitrageClassifier;
pub use profit::{Attribution, BalanceSheet, ProfitAttributor};
pub use provider::{ProviderEntry, ProviderTable};
pub use reimbursement::{
    strategy_from_config, FlatTip, NoReimbursement, Reimbursement, ReimbursementStrategy, RelayKind,
    SeparateTipLookup,
};
