//! Solana RPC + pubsub client backing the `ChainClient` boundary

use super::chain_client::{AccountNotification, ChainClient};
use super::transaction_parser::parse_confirmed_transaction;
use crate::domain::trade::TradeCandidate;
use crate::shared::errors::ChainError;
use crate::shared::types::{PushHandle, TrackedAddress};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcTransactionConfig};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const ASSOCIATED_TOKEN_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

/// Associated token account of `owner` for `mint`
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey, ChainError> {
    let token_program = Pubkey::from_str(TOKEN_PROGRAM_ID)
        .map_err(|e| ChainError::InvalidAddress(format!("token program: {}", e)))?;
    let ata_program = Pubkey::from_str(ASSOCIATED_TOKEN_PROGRAM_ID)
        .map_err(|e| ChainError::InvalidAddress(format!("associated token program: {}", e)))?;

    let (address, _bump) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ata_program,
    );
    Ok(address)
}

struct LiveSubscription {
    address: TrackedAddress,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Solana RPC client wrapper with account-change subscriptions
pub struct SolanaChainClient {
    rpc: Arc<RpcClient>,
    ws_url: String,
    /// Replaced when a subscribe on it fails
    pubsub: RwLock<Arc<PubsubClient>>,
    commitment: CommitmentConfig,
    next_handle: AtomicU64,
    live: DashMap<PushHandle, LiveSubscription>,
}

impl SolanaChainClient {
    /// Connect to the RPC endpoint and open the websocket
    pub async fn connect(rpc_url: &str, ws_url: &str, commitment: &str) -> Result<Self, ChainError> {
        let commitment = CommitmentConfig::from_str(commitment).unwrap_or_else(|_| {
            warn!("Unknown commitment '{}', using confirmed", commitment);
            CommitmentConfig::confirmed()
        });

        info!("🔗 Connecting to Solana websocket: {}", ws_url);
        let pubsub = PubsubClient::new(ws_url)
            .await
            .map_err(|e| ChainError::Subscription(format!("Failed to connect to {}: {}", ws_url, e)))?;

        Ok(Self {
            rpc: Arc::new(RpcClient::new_with_commitment(rpc_url.to_string(), commitment)),
            ws_url: ws_url.to_string(),
            pubsub: RwLock::new(Arc::new(pubsub)),
            commitment,
            next_handle: AtomicU64::new(1),
            live: DashMap::new(),
        })
    }

    /// Open a fresh websocket unless another caller already replaced `failed`
    async fn reconnect(&self, failed: &Arc<PubsubClient>) {
        let mut current = self.pubsub.write().await;
        if !Arc::ptr_eq(&*current, failed) {
            return;
        }

        match PubsubClient::new(&self.ws_url).await {
            Ok(client) => {
                *current = Arc::new(client);
                info!("🔗 Reconnected to Solana websocket: {}", self.ws_url);
            }
            Err(e) => warn!("Websocket reconnect to {} failed: {}", self.ws_url, e),
        }
    }

    fn pubkey(address: &TrackedAddress) -> Result<Pubkey, ChainError> {
        address
            .pubkey()
            .ok_or_else(|| ChainError::InvalidAddress(address.to_string()))
    }
}

#[async_trait]
impl ChainClient for SolanaChainClient {
    async fn subscribe_to_address_changes(
        &self,
        address: &TrackedAddress,
        notifications: mpsc::UnboundedSender<AccountNotification>,
    ) -> Result<PushHandle, ChainError> {
        let pubkey = Self::pubkey(address)?;
        let handle = PushHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let config = RpcAccountInfoConfig {
            commitment: Some(self.commitment),
            ..RpcAccountInfoConfig::default()
        };

        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), ChainError>>();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let pubsub = self.pubsub.read().await.clone();
        let client = pubsub.clone();
        let watched = address.clone();

        let task = tokio::spawn(async move {
            let (mut stream, unsubscribe) = match client.account_subscribe(&pubkey, Some(config)).await {
                Ok(subscription) => {
                    let _ = ready_tx.send(Ok(()));
                    subscription
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(ChainError::Subscription(e.to_string())));
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    update = stream.next() => match update {
                        Some(response) => {
                            let notification = AccountNotification {
                                address: watched.clone(),
                                slot: response.context.slot,
                            };
                            if notifications.send(notification).is_err() {
                                debug!("Watcher for {} is gone, closing stream", watched);
                                break;
                            }
                        }
                        None => {
                            warn!("Account stream for {} closed by node", watched);
                            break;
                        }
                    }
                }
            }

            // A closed channel is the watcher's cue to resubscribe
            drop(notifications);
            unsubscribe().await;
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.live.insert(
                    handle,
                    LiveSubscription {
                        address: address.clone(),
                        stop: stop_tx,
                        task,
                    },
                );
                debug!("Account subscription {} live for {}", handle, address);
                Ok(handle)
            }
            Ok(Err(e)) => {
                self.reconnect(&pubsub).await;
                Err(e)
            }
            Err(_) => {
                self.reconnect(&pubsub).await;
                Err(ChainError::Subscription(format!(
                    "subscription task for {} exited early",
                    address
                )))
            }
        }
    }

    async fn unsubscribe(&self, handle: PushHandle) -> Result<(), ChainError> {
        let (_, subscription) = self.live.remove(&handle).ok_or(ChainError::UnknownHandle(handle.0))?;

        if subscription.stop.send(()).is_err() {
            // The stream already ended on its own
            subscription.task.abort();
        }
        debug!("Account subscription {} closed for {}", handle, subscription.address);
        Ok(())
    }

    async fn recent_signatures(&self, address: &TrackedAddress, limit: usize) -> Result<Vec<String>, ChainError> {
        let pubkey = Self::pubkey(address)?;
        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until: None,
            limit: Some(limit),
            commitment: Some(self.commitment),
        };

        let statuses = self
            .rpc
            .get_signatures_for_address_with_config(&pubkey, config)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get signatures for {}: {}", address, e)))?;

        Ok(statuses.into_iter().map(|status| status.signature).collect())
    }

    async fn fetch_parsed_transaction(&self, signature: &str) -> Result<Option<TradeCandidate>, ChainError> {
        let parsed_signature =
            Signature::from_str(signature).map_err(|e| ChainError::InvalidSignature(format!("{}: {}", signature, e)))?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        let transaction = self
            .rpc
            .get_transaction_with_config(&parsed_signature, config)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get transaction {}: {}", signature, e)))?;

        Ok(parse_confirmed_transaction(signature, transaction))
    }

    async fn get_balance(&self, address: &TrackedAddress) -> Result<u64, ChainError> {
        let pubkey = Self::pubkey(address)?;
        self.rpc
            .get_balance(&pubkey)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get balance of {}: {}", address, e)))
    }

    async fn token_balance(&self, owner: &TrackedAddress, mint: &str) -> Result<f64, ChainError> {
        let owner_key = Self::pubkey(owner)?;
        let mint_key = Pubkey::from_str(mint).map_err(|e| ChainError::InvalidAddress(format!("{}: {}", mint, e)))?;
        let token_account = associated_token_address(&owner_key, &mint_key)?;

        let account = self
            .rpc
            .get_account_with_commitment(&token_account, self.commitment)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get token account {}: {}", token_account, e)))?;
        if account.value.is_none() {
            return Ok(0.0);
        }

        let amount = self
            .rpc
            .get_token_account_balance(&token_account)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get token balance of {}: {}", token_account, e)))?;

        Ok(amount.ui_amount.unwrap_or(0.0))
    }
}
