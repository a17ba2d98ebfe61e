//! Utility functions and helpers

use chrono::{DateTime, Utc};
use solana_sdk::native_token::LAMPORTS_PER_SOL;

/// Convert lamports to SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Signed lamport difference expressed in SOL
pub fn lamport_delta_to_sol(delta: i128) -> f64 {
    delta as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert a raw token amount to whole units
pub fn raw_to_ui(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10_f64.powi(decimals as i32)
}

/// Solscan link for a transaction signature
pub fn solscan_url(signature: &str) -> String {
    format!("https://solscan.io/tx/{}", signature)
}

/// Format a unix block time for log lines
pub fn format_block_time(block_time: Option<i64>) -> String {
    block_time
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
