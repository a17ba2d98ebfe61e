//! Decides whether a transaction is an arbitrage trade

use crate::domain::trade::TradeCandidate;
use std::collections::HashSet;
use tracing::debug;

/// Allow-list classifier over invoked program ids
#[derive(Debug, Clone)]
pub struct ArbitrageClassifier {
    programs: HashSet<String>,
}

impl ArbitrageClassifier {
    pub fn new<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            programs: programs.into_iter().map(Into::into).collect(),
        }
    }

    /// True iff the transaction succeeded and touched an allow-listed program
    pub fn is_arbitrage(&self, tx: &TradeCandidate) -> bool {
        if !tx.succeeded() {
            debug!("{} failed on-chain, skipping", tx.signature);
            return false;
        }

        let program_ids = tx.program_ids();
        let matched: Vec<&str> = program_ids
            .iter()
            .copied()
            .filter(|id| self.programs.contains(*id))
            .collect();

        debug!(
            "{}: programs={:?} dex interactions={:?}",
            tx.signature, program_ids, matched
        );

        !matched.is_empty()
    }
}
