//! Trade domain - parsed transactions and dedup state

pub mod candidate;
pub mod instruction;
pub mod ledger;

pub use candidate::{TokenBalance, TradeCandidate};
pub use instruction::{Instruction, InstructionKind, Placement};
pub use ledger::ProcessedSignatureLedger;
