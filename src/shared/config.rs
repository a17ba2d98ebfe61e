//! Bot configuration loaded from `Config.toml`

use crate::shared::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    /// Derived from `rpc_url` when absent
    pub ws_url: Option<String>,
    pub commitment: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: None,
            commitment: "confirmed".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn websocket_url(&self) -> String {
        self.ws_url.clone().unwrap_or_else(|| {
            self.rpc_url
                .replacen("https://", "wss://", 1)
                .replacen("http://", "ws://", 1)
        })
    }
}

/// Trade ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Signatures fetched per push notification
    pub signature_lookback: usize,
    pub ledger_capacity: usize,
    pub subscribe_retries: u32,
    pub subscribe_retry_delay_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            signature_lookback: 10,
            ledger_capacity: 256,
            subscribe_retries: 3,
            subscribe_retry_delay_ms: 5000,
        }
    }
}

impl IngestConfig {
    pub fn subscribe_retry_delay(&self) -> Duration {
        Duration::from_millis(self.subscribe_retry_delay_ms)
    }
}

/// Subscription restoration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub ready_timeout_ms: u64,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_delay_ms: 1000,
            ready_timeout_ms: 30_000,
        }
    }
}

/// Programs whose presence marks a transaction as an arbitrage trade
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub programs: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            programs: vec![
                "JUP6ivLEzfRyir16JMq1o1w8WywjYsFnE6HAx5TyZnd".to_string(), // Jupiter
                "JUP6LiYdsyVJBTY7S4XxNBHf6Xwr9xjvLNwubLp6jZB".to_string(), // Jupiter V6
                "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK".to_string(), // Raydium CLMM
                "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string(), // Raydium V4
                "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc".to_string(), // Orca Whirlpool
                "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo".to_string(), // Meteora DLMM
                "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string(), // Serum
                "2wT8Yq49kHgDzXuPxZSaeLaH1qbmGXtEyPy64bL7aD3c".to_string(), // Lifinity
            ],
        }
    }
}

/// One fee-routing provider and the accounts its tips land in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub accounts: Vec<String>,
}

/// How reimbursed tips are found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ReimbursementConfig {
    None,
    FlatTip { lamports: u64, label: Option<String> },
    SeparateTip { lookback: usize },
}

impl Default for ReimbursementConfig {
    fn default() -> Self {
        ReimbursementConfig::SeparateTip { lookback: 5 }
    }
}

/// Profit and provider attribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub wrapped_sol_mint: String,
    pub usdc_mint: String,
    pub lending_programs: Vec<String>,
    pub fallback_provider: String,
    /// Checked in declaration order, first match wins
    pub providers: Vec<ProviderConfig>,
    pub reimbursement: ReimbursementConfig,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            wrapped_sol_mint: WRAPPED_SOL_MINT.to_string(),
            usdc_mint: USDC_MINT.to_string(),
            lending_programs: vec![
                "So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo".to_string(), // Solend
                "KLend2g3cP87fffoy8q1mQqGKjrxjC8boSyAYavgmjD".to_string(), // Kamino Lend
                "MFv2hWf31Z9kbCa1snEPYctwafyhdvnV7FZnsebVacA".to_string(), // MarginFi
            ],
            fallback_provider: "RPC".to_string(),
            providers: default_providers(),
            reimbursement: ReimbursementConfig::default(),
        }
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    let provider = |name: &str, accounts: &[&str]| ProviderConfig {
        name: name.to_string(),
        accounts: accounts.iter().map(|a| a.to_string()).collect(),
    };

    vec![
        provider(
            "Jito",
            &[
                "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
                "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
                "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
                "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
                "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
                "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
                "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
                "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
            ],
        ),
        provider(
            "Temporal",
            &[
                "TEMPaMeCRFAS9EKF53Jd6KpHxgL47uWLcpFArU1Fanq",
                "noz3jAjPiHuBPqiSPkkugaJDkJscPuRhYnSpbi8UvC4",
            ],
        ),
        provider(
            "bloXroute",
            &[
                "HWEoBxYs7ssKuudEjzjmpfJVX7Dvi7wescFsVx2L5yoY",
                "95cfoy472fcQHaw4tPGBTKpn6ZQnfEPfBgDQx6gcRmRg",
            ],
        ),
        provider(
            "NextBlock",
            &[
                "NEXTbLoCkB51HpLBLojQfpyVAMorm3zzKg7w9NFdqid",
                "NeXTBLoCKs9F1y5PJS9CKrFNNLU1keHW71rfh7KgA1X",
            ],
        ),
    ]
}

/// Spot price feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            url: "https://api.binance.com/api/v3/ticker/price?symbol=SOLUSDC".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Persistent store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "subscriptions.json".to_string(),
        }
    }
}

/// Notification delivery settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Log trades instead of posting them
    pub log_only: bool,
    /// channel id -> webhook url
    pub channels: HashMap<String, String>,
    /// user id -> webhook url for direct-message tracking
    pub direct: HashMap<String, String>,
}

/// Bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub network: NetworkConfig,
    pub ingest: IngestConfig,
    pub restore: RestoreConfig,
    pub classifier: ClassifierConfig,
    pub attribution: AttributionConfig,
    pub price: PriceConfig,
    pub store: StoreConfig,
    pub notify: NotifyConfig,
}

impl BotConfig {
    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.signature_lookback == 0 {
            return Err(ConfigError::Invalid("ingest.signature_lookback must be > 0".to_string()));
        }
        if self.ingest.ledger_capacity < self.ingest.signature_lookback {
            return Err(ConfigError::Invalid(
                "ingest.ledger_capacity must be >= ingest.signature_lookback".to_string(),
            ));
        }
        if self.restore.batch_size == 0 {
            return Err(ConfigError::Invalid("restore.batch_size must be > 0".to_string()));
        }
        if self.classifier.programs.is_empty() {
            return Err(ConfigError::Invalid("classifier.programs must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BotConfig, ConfigError> {
        let config_content = fs::read_to_string(path.as_ref())?;
        Self::parse(&config_content)
    }

    pub fn parse(content: &str) -> Result<BotConfig, ConfigError> {
        let config: BotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
