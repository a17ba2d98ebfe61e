//! Reimbursed tip detection strategies

use crate::domain::trade::{Placement, TradeCandidate};
use crate::infrastructure::blockchain::ChainClient;
use crate::shared::config::ReimbursementConfig;
use crate::shared::types::TrackedAddress;
use crate::shared::utils::lamports_to_sol;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a refunded tip was relayed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// Refund is a top-level transfer from a pre-funded relay
    Static,
    /// Refund is an inner instruction of the relay's transaction
    Dynamic,
}

impl RelayKind {
    fn from_placement(placement: Placement) -> Self {
        match placement {
            Placement::Outer => RelayKind::Static,
            Placement::Inner => RelayKind::Dynamic,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelayKind::Static => "Separate Tip (static)",
            RelayKind::Dynamic => "Separate Tip (dynamic)",
        }
    }
}

/// Amount returned to the tracked wallet outside the trade itself
#[derive(Debug, Clone, PartialEq)]
pub struct Reimbursement {
    pub lamports: u64,
    /// Provider label implied by the refund, if any
    pub provider: Option<String>,
    pub relay: Option<RelayKind>,
}

impl Reimbursement {
    pub fn sol(&self) -> f64 {
        lamports_to_sol(self.lamports)
    }
}

/// Policy for finding reimbursements, chosen by configuration
#[async_trait]
pub trait ReimbursementStrategy: Send + Sync {
    async fn find(&self, tx: &TradeCandidate, address: &TrackedAddress) -> Option<Reimbursement>;

    fn name(&self) -> &'static str;
}

/// Never reimburses
pub struct NoReimbursement;

#[async_trait]
impl ReimbursementStrategy for NoReimbursement {
    async fn find(&self, _tx: &TradeCandidate, _address: &TrackedAddress) -> Option<Reimbursement> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Adds a constant tip back to every trade
pub struct FlatTip {
    lamports: u64,
    label: Option<String>,
}

impl FlatTip {
    pub fn new(lamports: u64, label: Option<String>) -> Self {
        Self { lamports, label }
    }
}

#[async_trait]
impl ReimbursementStrategy for FlatTip {
    async fn find(&self, _tx: &TradeCandidate, _address: &TrackedAddress) -> Option<Reimbursement> {
        Some(Reimbursement {
            lamports: self.lamports,
            provider: self.label.clone(),
            relay: None,
        })
    }

    fn name(&self) -> &'static str {
        "flat_tip"
    }
}

/// Follows tips paid to an intermediary and looks for the refund it sends back
pub struct SeparateTipLookup {
    chain: Arc<dyn ChainClient>,
    lookback: usize,
}

impl SeparateTipLookup {
    pub fn new(chain: Arc<dyn ChainClient>, lookback: usize) -> Self {
        Self {
            chain,
            lookback: lookback.max(1),
        }
    }

    /// Accounts the tracked wallet sent SOL to inside `tx`, in instruction order
    pub fn intermediaries(tx: &TradeCandidate, address: &TrackedAddress) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for ix in &tx.instructions {
            if let Some(destination) = ix.sol_destination() {
                let from_wallet = ix.sol_transfer_between(address.as_str(), destination).is_some();
                if from_wallet && destination != address.as_str() && !found.iter().any(|d| d == destination) {
                    found.push(destination.to_string());
                }
            }
        }
        found
    }

    async fn refund_from(
        &self,
        intermediary: &str,
        address: &TrackedAddress,
        trade_signature: &str,
    ) -> Option<Reimbursement> {
        let relay = TrackedAddress::new_unchecked(intermediary);
        let signatures = match self.chain.recent_signatures(&relay, self.lookback).await {
            Ok(signatures) => signatures,
            Err(e) => {
                warn!("Failed to list transactions of intermediary {}: {}", intermediary, e);
                return None;
            }
        };

        for signature in signatures.iter().filter(|s| s.as_str() != trade_signature) {
            let follow_up = match self.chain.fetch_parsed_transaction(signature).await {
                Ok(Some(tx)) => tx,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping follow-up {}: {}", signature, e);
                    continue;
                }
            };

            let refund = follow_up.instructions.iter().find_map(|ix| {
                ix.sol_transfer_between(intermediary, address.as_str())
                    .map(|lamports| (lamports, ix.placement))
            });

            if let Some((lamports, placement)) = refund {
                let relay = RelayKind::from_placement(placement);
                debug!(
                    "Found {} refund of {} lamports from {} in {}",
                    relay.label(),
                    lamports,
                    intermediary,
                    signature
                );
                return Some(Reimbursement {
                    lamports,
                    provider: Some(relay.label().to_string()),
                    relay: Some(relay),
                });
            }
        }
        None
    }
}

#[async_trait]
impl ReimbursementStrategy for SeparateTipLookup {
    async fn find(&self, tx: &TradeCandidate, address: &TrackedAddress) -> Option<Reimbursement> {
        for intermediary in Self::intermediaries(tx, address) {
            if let Some(reimbursement) = self.refund_from(&intermediary, address, &tx.signature).await {
                return Some(reimbursement);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "separate_tip"
    }
}

/// Build the configured strategy
pub fn strategy_from_config(
    config: &ReimbursementConfig,
    chain: Arc<dyn ChainClient>,
) -> Arc<dyn ReimbursementStrategy> {
    match config {
        ReimbursementConfig::None => Arc::new(NoReimbursement),
        ReimbursementConfig::FlatTip { lamports, label } => Arc::new(FlatTip::new(*lamports, label.clone())),
        ReimbursementConfig::SeparateTip { lookback } => Arc::new(SeparateTipLookup::new(chain, *lookback)),
    }
}
