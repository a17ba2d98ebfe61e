//! Solana node access: account subscriptions, signatures, parsed transactions

pub mod chain_client;
pub mod rpc_client;
pub mod transaction_parser;

pub use chain_client::{AccountNotification, ChainClient};
pub use rpc_client::{associated_token_address, SolanaChainClient};
pub use transaction_parser::{parse_confirmed_transaction, MEMO_PROGRAM_IDS};
