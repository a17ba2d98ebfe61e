//! Flattened transaction instructions

use serde::{Deserialize, Serialize};

/// Whether an instruction was top-level or invoked through CPI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Outer,
    Inner,
}

/// What an instruction does, as far as trade attribution cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// System program lamport transfer
    SolTransfer {
        source: String,
        destination: String,
        lamports: u64,
    },
    /// SPL token `transfer` / `transferChecked`
    TokenTransfer {
        source: String,
        destination: String,
        authority: Option<String>,
        mint: Option<String>,
        amount: u64,
    },
    Memo(String),
    Other,
}

/// One instruction of a parsed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub program_id: String,
    pub placement: Placement,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn new(program_id: impl Into<String>, placement: Placement, kind: InstructionKind) -> Self {
        Self {
            program_id: program_id.into(),
            placement,
            kind,
        }
    }

    /// Lamports moved from `from` to `to`, if this is such a transfer
    pub fn sol_transfer_between(&self, from: &str, to: &str) -> Option<u64> {
        match &self.kind {
            InstructionKind::SolTransfer {
                source,
                destination,
                lamports,
            } if source == from && destination == to => Some(*lamports),
            InstructionKind::SolTransfer { .. }
            | InstructionKind::TokenTransfer { .. }
            | InstructionKind::Memo(_)
            | InstructionKind::Other => None,
        }
    }

    /// Destination of a SOL transfer
    pub fn sol_destination(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::SolTransfer { destination, .. } => Some(destination),
            InstructionKind::TokenTransfer { .. } | InstructionKind::Memo(_) | InstructionKind::Other => None,
        }
    }

    pub fn memo(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::Memo(text) => Some(text),
            InstructionKind::SolTransfer { .. } | InstructionKind::TokenTransfer { .. } | InstructionKind::Other => {
                None
            }
        }
    }
}
