//! Parsed transaction handed to classification and attribution

use super::instruction::Instruction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// SPL token balance entry from transaction metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: String,
    pub owner: Option<String>,
    /// Raw amount in base units
    pub amount: u64,
    pub decimals: u8,
}

/// A confirmed transaction with metadata, flattened for inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub account_keys: Vec<String>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    /// Outer instructions followed by inner instructions
    pub instructions: Vec<Instruction>,
    /// Execution error, `None` on success
    pub err: Option<String>,
}

impl TradeCandidate {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }

    /// Distinct program ids invoked anywhere in the transaction
    pub fn program_ids(&self) -> BTreeSet<&str> {
        self.instructions.iter().map(|ix| ix.program_id.as_str()).collect()
    }

    pub fn invokes_any<'a, I>(&self, programs: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        let invoked = self.program_ids();
        programs.into_iter().any(|p| invoked.contains(p.as_str()))
    }

    pub fn account_index(&self, address: &str) -> Option<usize> {
        self.account_keys.iter().position(|key| key == address)
    }
}
