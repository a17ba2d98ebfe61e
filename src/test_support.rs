//! In-crate fakes shared by unit tests

use crate::domain::trade::{Instruction, InstructionKind, Placement, TokenBalance, TradeCandidate};
use crate::infrastructure::blockchain::{AccountNotification, ChainClient};
use crate::infrastructure::notify::{DeliveryTransport, NotificationSink};
use crate::shared::errors::{ChainError, NotifyError, ResolveError};
use crate::shared::types::{DeliveryTarget, PushHandle, Route, TrackedAddress, TradeResult, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Builds `TradeCandidate`s field by field
pub struct CandidateBuilder {
    tx: TradeCandidate,
}

impl CandidateBuilder {
    pub fn new(signature: &str) -> Self {
        Self {
            tx: TradeCandidate {
                signature: signature.to_string(),
                slot: 1,
                block_time: None,
                account_keys: Vec::new(),
                pre_balances: Vec::new(),
                post_balances: Vec::new(),
                pre_token_balances: Vec::new(),
                post_token_balances: Vec::new(),
                instructions: Vec::new(),
                err: None,
            },
        }
    }

    pub fn slot(mut self, slot: u64) -> Self {
        self.tx.slot = slot;
        self
    }

    pub fn block_time(mut self, block_time: i64) -> Self {
        self.tx.block_time = Some(block_time);
        self
    }

    /// Account key with its native pre/post balances
    pub fn account(mut self, key: &str, pre: u64, post: u64) -> Self {
        self.tx.account_keys.push(key.to_string());
        self.tx.pre_balances.push(pre);
        self.tx.post_balances.push(post);
        self
    }

    /// Token balance entry owned by `owner`, present both before and after
    pub fn token(mut self, owner: &str, mint: &str, pre: u64, post: u64, decimals: u8) -> Self {
        let account_index = self.tx.pre_token_balances.len() as u8;
        let entry = |amount| TokenBalance {
            account_index,
            mint: mint.to_string(),
            owner: Some(owner.to_string()),
            amount,
            decimals,
        };
        self.tx.pre_token_balances.push(entry(pre));
        self.tx.post_token_balances.push(entry(post));
        self
    }

    pub fn instruction(mut self, program_id: &str, placement: Placement, kind: InstructionKind) -> Self {
        self.tx.instructions.push(Instruction::new(program_id, placement, kind));
        self
    }

    pub fn failed(mut self, err: &str) -> Self {
        self.tx.err = Some(err.to_string());
        self
    }

    pub fn build(self) -> TradeCandidate {
        self.tx
    }
}

/// Scriptable `ChainClient`
#[derive(Default)]
pub struct MockChain {
    signatures: Mutex<HashMap<String, Vec<String>>>,
    transactions: Mutex<HashMap<String, TradeCandidate>>,
    failing_fetches: Mutex<HashSet<String>>,
    fetched: Mutex<Vec<String>>,
    balances: Mutex<HashMap<String, u64>>,
    token_balances: Mutex<HashMap<(String, String), f64>>,
    listeners: Mutex<HashMap<PushHandle, (TrackedAddress, mpsc::UnboundedSender<AccountNotification>)>>,
    unsubscribed: Mutex<Vec<PushHandle>>,
    next_handle: AtomicU64,
    subscribe_calls: AtomicUsize,
    failing_subscribes: AtomicUsize,
    failing_addresses: Mutex<HashMap<String, usize>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(100),
            ..Self::default()
        }
    }

    /// Signature history of `address`, newest first
    pub fn set_signatures(&self, address: &str, signatures: Vec<&str>) {
        self.signatures.lock().unwrap().insert(
            address.to_string(),
            signatures.into_iter().map(str::to_string).collect(),
        );
    }

    pub fn insert_transaction(&self, tx: TradeCandidate) {
        self.transactions.lock().unwrap().insert(tx.signature.clone(), tx);
    }

    pub fn fail_fetch(&self, signature: &str) {
        self.failing_fetches.lock().unwrap().insert(signature.to_string());
    }

    pub fn heal_fetch(&self, signature: &str) {
        self.failing_fetches.lock().unwrap().remove(signature);
    }

    pub fn set_balance(&self, address: &str, lamports: u64) {
        self.balances.lock().unwrap().insert(address.to_string(), lamports);
    }

    pub fn set_token_balance(&self, owner: &str, mint: &str, amount: f64) {
        self.token_balances
            .lock()
            .unwrap()
            .insert((owner.to_string(), mint.to_string()), amount);
    }

    /// Make the next `n` subscribe attempts fail
    pub fn fail_next_subscribes(&self, n: usize) {
        self.failing_subscribes.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` subscribe attempts for `address` fail
    pub fn fail_next_subscribes_for(&self, address: &str, n: usize) {
        self.failing_addresses.lock().unwrap().insert(address.to_string(), n);
    }

    /// Drop the listeners of `address` as a node closing the stream would;
    /// returns how many were dropped
    pub fn drop_listener(&self, address: &str) -> usize {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|_, (watched, _)| watched.as_str() != address);
        before - listeners.len()
    }

    /// Signatures passed to `fetch_parsed_transaction`, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribed(&self) -> Vec<PushHandle> {
        self.unsubscribed.lock().unwrap().clone()
    }

    pub fn live_handles(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Emit an account-change push for `address`; returns how many listeners got it
    pub fn push(&self, address: &str, slot: u64) -> usize {
        let listeners = self.listeners.lock().unwrap();
        listeners
            .values()
            .filter(|(watched, _)| watched.as_str() == address)
            .filter(|(watched, sender)| {
                sender
                    .send(AccountNotification {
                        address: watched.clone(),
                        slot,
                    })
                    .is_ok()
            })
            .count()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn subscribe_to_address_changes(
        &self,
        address: &TrackedAddress,
        notifications: mpsc::UnboundedSender<AccountNotification>,
    ) -> Result<PushHandle, ChainError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(remaining) = self.failing_addresses.lock().unwrap().get_mut(address.as_str()) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ChainError::Subscription(format!("node refused {}", address)));
            }
        }
        let failing = self.failing_subscribes.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_subscribes.store(failing - 1, Ordering::SeqCst);
            return Err(ChainError::Subscription("node unavailable".to_string()));
        }

        let handle = PushHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .unwrap()
            .insert(handle, (address.clone(), notifications));
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: PushHandle) -> Result<(), ChainError> {
        self.listeners
            .lock()
            .unwrap()
            .remove(&handle)
            .ok_or(ChainError::UnknownHandle(handle.0))?;
        self.unsubscribed.lock().unwrap().push(handle);
        Ok(())
    }

    async fn recent_signatures(&self, address: &TrackedAddress, limit: usize) -> Result<Vec<String>, ChainError> {
        let signatures = self.signatures.lock().unwrap();
        Ok(signatures
            .get(address.as_str())
            .map(|all| all.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_parsed_transaction(&self, signature: &str) -> Result<Option<TradeCandidate>, ChainError> {
        self.fetched.lock().unwrap().push(signature.to_string());
        if self.failing_fetches.lock().unwrap().contains(signature) {
            return Err(ChainError::Rpc(format!("timeout fetching {}", signature)));
        }
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn get_balance(&self, address: &TrackedAddress) -> Result<u64, ChainError> {
        self.balances
            .lock()
            .unwrap()
            .get(address.as_str())
            .copied()
            .ok_or_else(|| ChainError::Rpc(format!("no balance for {}", address)))
    }

    async fn token_balance(&self, owner: &TrackedAddress, mint: &str) -> Result<f64, ChainError> {
        self.token_balances
            .lock()
            .unwrap()
            .get(&(owner.to_string(), mint.to_string()))
            .copied()
            .ok_or_else(|| ChainError::Rpc(format!("no {} balance for {}", mint, owner)))
    }
}

/// Sink that keeps every delivery
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(TradeResult, DeliveryTarget)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(TradeResult, DeliveryTarget)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn signatures(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(result, _)| result.signature.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, result: &TradeResult, target: &DeliveryTarget) -> Result<(), NotifyError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((result.clone(), target.clone()));
        Ok(())
    }
}

/// Transport resolving everything except the ids it was told to reject
pub struct FakeTransport {
    ready: bool,
    rejected_users: HashMap<String, ResolveError>,
    rejected_channels: HashMap<String, ResolveError>,
    resolved_at: Mutex<Vec<Instant>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            ready: true,
            rejected_users: HashMap::new(),
            rejected_channels: HashMap::new(),
            resolved_at: Mutex::new(Vec::new()),
        }
    }

    /// Transport whose `wait_ready` never completes
    pub fn never_ready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn reject_user(mut self, user: &str, error: ResolveError) -> Self {
        self.rejected_users.insert(user.to_string(), error);
        self
    }

    pub fn reject_channel(mut self, channel: &str, error: ResolveError) -> Self {
        self.rejected_channels.insert(channel.to_string(), error);
        self
    }

    /// When each resolve call happened, in call order
    pub fn resolution_times(&self) -> Vec<Instant> {
        self.resolved_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryTransport for FakeTransport {
    async fn wait_ready(&self) {
        if !self.ready {
            std::future::pending::<()>().await;
        }
    }

    async fn resolve_direct(&self, user: &UserId) -> Result<DeliveryTarget, ResolveError> {
        self.resolved_at.lock().unwrap().push(Instant::now());
        match self.rejected_users.get(user.as_str()) {
            Some(error) => Err(error.clone()),
            None => Ok(DeliveryTarget::new(Route::Direct(user.clone()), format!("dm:{}", user))),
        }
    }

    async fn resolve_channel(&self, channel_id: &str) -> Result<DeliveryTarget, ResolveError> {
        self.resolved_at.lock().unwrap().push(Instant::now());
        match self.rejected_channels.get(channel_id) {
            Some(error) => Err(error.clone()),
            None => Ok(DeliveryTarget::new(
                Route::Channel(channel_id.to_string()),
                format!("channel:{}", channel_id),
            )),
        }
    }
}
