//! Fee / priority-routing provider lookup

use crate::domain::trade::TradeCandidate;
use crate::shared::config::ProviderConfig;
use std::collections::HashSet;

/// A provider and the tip accounts it owns
#[derive(Debug, Clone)]
pub struct ProviderEntry {
    pub name: String,
    pub accounts: HashSet<String>,
}

/// Providers in priority order. The first entry with a tip account receiving
/// a SOL transfer in the transaction wins, regardless of instruction order.
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    entries: Vec<ProviderEntry>,
}

impl ProviderTable {
    pub fn new(entries: Vec<ProviderEntry>) -> Self {
        Self { entries }
    }

    pub fn from_config(providers: &[ProviderConfig]) -> Self {
        Self::new(
            providers
                .iter()
                .map(|p| ProviderEntry {
                    name: p.name.clone(),
                    accounts: p.accounts.iter().cloned().collect(),
                })
                .collect(),
        )
    }

    /// Name of the first provider whose tip account receives SOL in `tx`
    pub fn match_transaction(&self, tx: &TradeCandidate) -> Option<&str> {
        let destinations: HashSet<&str> = tx
            .instructions
            .iter()
            .filter_map(|ix| ix.sol_destination())
            .collect();

        self.entries
            .iter()
            .find(|entry| entry.accounts.iter().any(|acc| destinations.contains(acc.as_str())))
            .map(|entry| entry.name.as_str())
    }

    /// Whether `address` is any provider's tip account
    pub fn is_provider_account(&self, address: &str) -> bool {
        self.entries.iter().any(|entry| entry.accounts.contains(address))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
