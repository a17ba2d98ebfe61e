//! Line-oriented command surface
use crate::application::tracker::{TrackOutcome, TrackRequest, TrackingService, UntrackOutcome};
use crate::shared::errors::AppError;
use crate::shared::types::UserId;
use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "arbwatch", no_binary_name = true, disable_help_flag = true)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Track a wallet for arbitrage trades
    Track {
        /// Subscriber id
        user: String,

        /// Solana wallet address
        address: String,

        /// Channel to post into; direct messages when omitted
        channel: Option<String>,
    },

    /// Stop tracking the user's wallet
    Untrack {
        /// Subscriber id
        user: String,
    },

    /// List tracked wallets
    Status,
}

impl Command {
    /// Parse one input line; `Ok(None)` for blank lines and comments
    pub fn parse_line(line: &str) -> Result<Option<Self>, clap::Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        CommandLine::try_parse_from(line.split_whitespace()).map(|parsed| Some(parsed.command))
    }
}

/// Executes parsed commands against the tracking service
pub struct CommandExecutor {
    tracker: Arc<TrackingService>,
}

impl CommandExecutor {
    pub fn new(tracker: Arc<TrackingService>) -> Self {
        Self { tracker }
    }

    /// Run one command, returning the reply shown to the caller
    pub async fn execute(&self, command: Command) -> Result<String, AppError> {
        match command {
            Command::Track { user, address, channel } => {
                let request = TrackRequest {
                    user: UserId::new(user),
                    address,
                    channel_id: channel,
                };
                let user = request.user.clone();

                match self.tracker.track(request).await? {
                    TrackOutcome::AlreadyTracking(address) => {
                        Ok(format!("{} is already tracking {}. Untrack it first.", user, address))
                    }
                    TrackOutcome::Started { address, handle } => {
                        info!("Track command for {} -> {}", user, address);
                        Ok(format!("Now tracking {} for {} (subscription {})", address, user, handle))
                    }
                }
            }
            Command::Untrack { user } => match self.tracker.untrack(&UserId::new(user.clone())).await? {
                UntrackOutcome::NotTracking => {
                    warn!("Untrack requested by {} with nothing tracked", user);
                    Ok(format!("{} is not tracking any wallet", user))
                }
                UntrackOutcome::Stopped(address) => Ok(format!("Stopped tracking {} for {}", address, user)),
            },
            Command::Status => {
                let rows = self.tracker.status();
                if rows.is_empty() {
                    return Ok("No wallets tracked".to_string());
                }

                let mut reply = format!("{} wallets tracked:", rows.len());
                for row in rows {
                    let _ = write!(
                        reply,
                        "\n  {} - {} subscribers (subscription {})",
                        row.address, row.subscribers, row.handle
                    );
                }
                Ok(reply)
            }
        }
    }
}
