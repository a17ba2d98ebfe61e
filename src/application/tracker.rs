//! Track / untrack entry points and chain subscription lifecycle

use super::ingestion::{AddressWatcher, ClosedStream, IngestPipeline, TradeIngestor};
use crate::domain::subscription::Unsubscribed;
use crate::infrastructure::blockchain::AccountNotification;
use crate::infrastructure::notify::DeliveryTransport;
use crate::infrastructure::store::SubscriptionStore;
use crate::shared::config::IngestConfig;
use crate::shared::errors::{AppError, ChainError};
use crate::shared::types::{DeliveryTarget, PersistedSubscription, PushHandle, TrackedAddress, UserId};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// A user's request to start tracking a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub user: UserId,
    /// Raw address as typed by the user
    pub address: String,
    /// Shared channel to post into; direct messages when `None`
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The user already tracks this address
    AlreadyTracking(TrackedAddress),
    Started { address: TrackedAddress, handle: PushHandle },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntrackOutcome {
    NotTracking,
    Stopped(TrackedAddress),
}

/// One row of `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedStatus {
    pub address: TrackedAddress,
    pub handle: PushHandle,
    pub subscribers: usize,
}

type KeyedLocks<K> = DashMap<K, Arc<Mutex<()>>>;

async fn lock_key<K: Eq + Hash + Clone>(locks: &KeyedLocks<K>, key: &K) -> OwnedMutexGuard<()> {
    let lock = locks.entry(key.clone()).or_default().clone();
    lock.lock_owned().await
}

/// Owns chain subscriptions and watcher tasks for every tracked address
pub struct TrackingService {
    pipeline: Arc<IngestPipeline>,
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn DeliveryTransport>,
    watchers: DashMap<TrackedAddress, JoinHandle<()>>,
    /// Lock order is user, then address
    user_locks: KeyedLocks<UserId>,
    address_locks: KeyedLocks<TrackedAddress>,
    closed_tx: mpsc::UnboundedSender<ClosedStream>,
    closed_rx: Mutex<mpsc::UnboundedReceiver<ClosedStream>>,
    subscribe_attempts: u32,
    retry_delay: Duration,
}

impl TrackingService {
    pub fn new(
        pipeline: Arc<IngestPipeline>,
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn DeliveryTransport>,
        config: &IngestConfig,
    ) -> Self {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        Self {
            pipeline,
            store,
            transport,
            watchers: DashMap::new(),
            user_locks: DashMap::new(),
            address_locks: DashMap::new(),
            closed_tx,
            closed_rx: Mutex::new(closed_rx),
            subscribe_attempts: config.subscribe_retries.max(1),
            retry_delay: config.subscribe_retry_delay(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn DeliveryTransport> {
        &self.transport
    }

    /// Start tracking `request.address` for `request.user`
    pub async fn track(&self, request: TrackRequest) -> Result<TrackOutcome, AppError> {
        let address =
            TrackedAddress::parse(&request.address).ok_or_else(|| AppError::InvalidAddress(request.address.clone()))?;

        let _user = lock_key(&self.user_locks, &request.user).await;

        if let Some(existing) = self.store.find_by_user(&request.user).await? {
            info!("User {} already tracks {}", request.user, existing.address);
            return Ok(TrackOutcome::AlreadyTracking(existing.address));
        }

        let target = match &request.channel_id {
            Some(channel) => self.transport.resolve_channel(channel).await?,
            None => self.transport.resolve_direct(&request.user).await?,
        };

        let _address = lock_key(&self.address_locks, &address).await;
        let handle = self.attach_locked(&address, &request.user, target).await?;

        let record = PersistedSubscription::new(request.user.clone(), address.clone(), request.channel_id.clone());
        if let Err(e) = self.store.upsert_subscription(record).await {
            error!("Failed to persist tracking of {} for {}: {}", address, request.user, e);
            self.detach_locked(&address, &request.user).await;
            return Err(e.into());
        }
        if let Err(e) = self.store.update_push_handle(&address, handle).await {
            error!("Failed to persist subscription {} for {}: {}", handle, address, e);
            if let Err(cleanup) = self.store.delete_subscription(&request.user).await {
                warn!("Failed to drop stored row of {}: {}", request.user, cleanup);
            }
            self.detach_locked(&address, &request.user).await;
            return Err(e.into());
        }

        info!("👀 {} is now tracking {} ({})", request.user, address, handle);
        Ok(TrackOutcome::Started { address, handle })
    }

    /// Stop whatever `user` is tracking
    pub async fn untrack(&self, user: &UserId) -> Result<UntrackOutcome, AppError> {
        let _user = lock_key(&self.user_locks, user).await;

        let Some(existing) = self.store.find_by_user(user).await? else {
            return Ok(UntrackOutcome::NotTracking);
        };

        let _address = lock_key(&self.address_locks, &existing.address).await;
        // Stored row goes first so a failed write leaves the stream running
        self.store.delete_subscription(user).await?;
        self.detach_locked(&existing.address, user).await;

        info!("🛑 {} stopped tracking {}", user, existing.address);
        Ok(UntrackOutcome::Stopped(existing.address))
    }

    /// Register `user` on `address` with an already resolved target, opening
    /// the chain subscription if nobody watches the address yet
    pub async fn attach(
        &self,
        address: &TrackedAddress,
        user: &UserId,
        target: DeliveryTarget,
    ) -> Result<PushHandle, ChainError> {
        let _address = lock_key(&self.address_locks, address).await;
        self.attach_locked(address, user, target).await
    }

    async fn attach_locked(
        &self,
        address: &TrackedAddress,
        user: &UserId,
        target: DeliveryTarget,
    ) -> Result<PushHandle, ChainError> {
        let registry = &self.pipeline.registry;

        let handle = match registry.handle_of(address) {
            Some(existing) => registry.subscribe(address, user, existing),
            None => {
                let (sender, receiver) = mpsc::unbounded_channel();
                let handle = self.subscribe_with_retry(address, sender).await?;
                registry.subscribe(address, user, handle);

                let ingestor = TradeIngestor::new(address.clone(), self.pipeline.clone());
                self.spawn_watcher(address, handle, ingestor, receiver);
                handle
            }
        };

        self.pipeline.recipients.insert(user.clone(), target);
        Ok(handle)
    }

    fn spawn_watcher(
        &self,
        address: &TrackedAddress,
        handle: PushHandle,
        ingestor: TradeIngestor,
        receiver: mpsc::UnboundedReceiver<AccountNotification>,
    ) {
        let watcher = AddressWatcher::spawn(handle, ingestor, receiver, self.closed_tx.clone());
        if let Some(previous) = self.watchers.insert(address.clone(), watcher) {
            previous.abort();
        }
    }

    async fn detach_locked(&self, address: &TrackedAddress, user: &UserId) {
        self.pipeline.recipients.remove(user);

        match self.pipeline.registry.unsubscribe(address, user) {
            Unsubscribed::Released(handle) => self.release(address, handle).await,
            Unsubscribed::Remaining(n) => {
                info!("{} still has {} subscribers", address, n)
            }
            Unsubscribed::NotSubscribed => {}
        }
    }

    async fn release(&self, address: &TrackedAddress, handle: PushHandle) {
        if let Err(e) = self.pipeline.chain.unsubscribe(handle).await {
            warn!("Failed to unsubscribe {} for {}: {}", handle, address, e);
        }
        if let Some((_, watcher)) = self.watchers.remove(address) {
            watcher.abort();
        }
        info!("🔕 Released subscription {} for {}", handle, address);
    }

    async fn subscribe_with_retry(
        &self,
        address: &TrackedAddress,
        sender: mpsc::UnboundedSender<AccountNotification>,
    ) -> Result<PushHandle, ChainError> {
        let mut attempt = 1;
        loop {
            match self
                .pipeline
                .chain
                .subscribe_to_address_changes(address, sender.clone())
                .await
            {
                Ok(handle) => return Ok(handle),
                Err(e) if attempt < self.subscribe_attempts => {
                    warn!(
                        "Subscribe to {} failed (attempt {}/{}): {}",
                        address, attempt, self.subscribe_attempts, e
                    );
                    sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Giving up subscribing to {} after {} attempts: {}", address, attempt, e);
                    return Err(e);
                }
            }
        }
    }

    /// Re-open chain streams that end while their address is still tracked
    pub async fn recover_closed_streams(self: Arc<Self>) {
        while self.recover_next().await.is_some() {}
    }

    /// Wait for one closed stream and resubscribe its address if it is still
    /// tracked under the same handle
    pub async fn recover_next(&self) -> Option<TrackedAddress> {
        let closed = self.closed_rx.lock().await.recv().await?;
        let address = closed.ingestor.address().clone();
        let _address = lock_key(&self.address_locks, &address).await;

        let registry = &self.pipeline.registry;
        if registry.handle_of(&address) != Some(closed.handle) {
            debug!("Stream {} for {} already released", closed.handle, address);
            return Some(address);
        }

        warn!("⚠️ Stream {} for {} closed by the node, resubscribing", closed.handle, address);
        if let Err(e) = self.pipeline.chain.unsubscribe(closed.handle).await {
            debug!("Stale subscription {} already gone: {}", closed.handle, e);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        match self.subscribe_with_retry(&address, sender).await {
            Ok(handle) => {
                registry.rebind(&address, handle);
                self.spawn_watcher(&address, handle, closed.ingestor, receiver);
                if let Err(e) = self.store.update_push_handle(&address, handle).await {
                    warn!("Failed to store push handle for {}: {}", address, e);
                }
                info!("🔁 Resubscribed {} as {}", address, handle);
            }
            Err(e) => {
                error!("Could not resubscribe {}: {}, trying again later", address, e);
                let retry = self.closed_tx.clone();
                let delay = self.retry_delay;
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = retry.send(closed);
                });
            }
        }
        Some(address)
    }

    /// Snapshot of every live subscription
    pub fn status(&self) -> Vec<TrackedStatus> {
        let registry = &self.pipeline.registry;
        let mut rows: Vec<TrackedStatus> = registry
            .tracked_addresses()
            .into_iter()
            .filter_map(|address| {
                let handle = registry.handle_of(&address)?;
                Some(TrackedStatus {
                    subscribers: registry.subscriber_count(&address),
                    address,
                    handle,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.address.cmp(&b.address));
        rows
    }

    /// Tear down every chain subscription and watcher
    pub async fn shutdown(&self) {
        let registry = &self.pipeline.registry;

        for address in registry.tracked_addresses() {
            let _address = lock_key(&self.address_locks, &address).await;
            for user in registry.subscribers(&address) {
                self.detach_locked(&address, &user).await;
            }
        }
        info!("All subscriptions closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingestion::Recipients;
    use crate::application::TradeAnalyzer;
    use crate::domain::arbitrage::{ArbitrageClassifier, NoReimbursement, ProfitAttributor, ProviderTable};
    use crate::domain::subscription::SubscriptionRegistry;
    use crate::domain::trade::{InstructionKind, Placement, TradeCandidate};
    use crate::infrastructure::price::FixedPrice;
    use crate::infrastructure::store::{JsonFileStore, MemoryStore};
    use crate::shared::config::{USDC_MINT, WRAPPED_SOL_MINT};
    use crate::shared::errors::ResolveError;
    use crate::shared::types::Route;
    use crate::test_support::{CandidateBuilder, FakeTransport, MockChain, RecordingSink};
    use tokio::time::Instant;

    const WALLET_A: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const WALLET_B: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const WHIRLPOOL: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";

    struct Harness {
        chain: Arc<MockChain>,
        store: Arc<dyn SubscriptionStore>,
        sink: Arc<RecordingSink>,
        tracker: TrackingService,
    }

    fn harness_with(transport: FakeTransport) -> Harness {
        harness_on(transport, Arc::new(MemoryStore::new()))
    }

    fn harness_on(transport: FakeTransport, store: Arc<dyn SubscriptionStore>) -> Harness {
        let chain = Arc::new(MockChain::new());
        let sink = Arc::new(RecordingSink::new());
        let analyzer = TradeAnalyzer::new(
            chain.clone(),
            ProfitAttributor::new(ProviderTable::default(), WRAPPED_SOL_MINT, USDC_MINT, Vec::new(), "RPC"),
            Arc::new(NoReimbursement),
            Arc::new(FixedPrice(100.0)),
            WRAPPED_SOL_MINT,
            USDC_MINT,
        );
        let pipeline = Arc::new(IngestPipeline {
            chain: chain.clone(),
            classifier: ArbitrageClassifier::new([WHIRLPOOL]),
            analyzer,
            registry: Arc::new(SubscriptionRegistry::new()),
            recipients: Arc::new(Recipients::new()),
            sink: sink.clone(),
            lookback: 10,
            ledger_capacity: 256,
        });
        let tracker = TrackingService::new(pipeline, store.clone(), Arc::new(transport), &IngestConfig::default());

        Harness {
            chain,
            store,
            sink,
            tracker,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeTransport::new())
    }

    fn request(user: &str, address: &str) -> TrackRequest {
        TrackRequest {
            user: UserId::new(user),
            address: address.to_string(),
            channel_id: None,
        }
    }

    fn arb(signature: &str) -> TradeCandidate {
        CandidateBuilder::new(signature)
            .account(WALLET_A, 1_000_000_000, 1_020_000_000)
            .instruction(WHIRLPOOL, Placement::Outer, InstructionKind::Other)
            .build()
    }

    async fn wait_for_deliveries(sink: &RecordingSink, count: usize) {
        for _ in 0..100 {
            if sink.deliveries().len() >= count {
                break;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_shared_address_uses_one_handle() {
        let h = harness();

        let first = h.tracker.track(request("alice", WALLET_A)).await.unwrap();
        let second = h.tracker.track(request("bob", WALLET_A)).await.unwrap();

        let (TrackOutcome::Started { handle: a, .. }, TrackOutcome::Started { handle: b, .. }) = (first, second) else {
            panic!("both tracks should start");
        };
        assert_eq!(a, b);
        assert_eq!(h.chain.subscribe_calls(), 1);
        assert_eq!(h.tracker.status()[0].subscribers, 2);
    }

    #[tokio::test]
    async fn test_concurrent_tracks_subscribe_once() {
        let h = harness();

        let (a, b) = tokio::join!(
            h.tracker.track(request("alice", WALLET_A)),
            h.tracker.track(request("bob", WALLET_A))
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(h.chain.subscribe_calls(), 1);
        assert_eq!(h.chain.live_handles(), 1);
    }

    #[tokio::test]
    async fn test_handle_released_with_last_subscriber() {
        let h = harness();
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();
        h.tracker.track(request("bob", WALLET_A)).await.unwrap();

        let stopped = h.tracker.untrack(&UserId::new("alice")).await.unwrap();
        assert_eq!(stopped, UntrackOutcome::Stopped(TrackedAddress::new_unchecked(WALLET_A)));
        assert!(h.chain.unsubscribed().is_empty());
        assert_eq!(h.chain.live_handles(), 1);

        h.tracker.untrack(&UserId::new("bob")).await.unwrap();
        assert_eq!(h.chain.unsubscribed().len(), 1);
        assert_eq!(h.chain.live_handles(), 0);
        assert!(h.tracker.status().is_empty());
        let address = TrackedAddress::new_unchecked(WALLET_A);
        assert_eq!(h.store.push_handle(&address).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_one_address_per_user() {
        let h = harness();
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();

        let again = h.tracker.track(request("alice", WALLET_B)).await.unwrap();
        assert_eq!(again, TrackOutcome::AlreadyTracking(TrackedAddress::new_unchecked(WALLET_A)));
        assert_eq!(h.chain.subscribe_calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let h = harness();
        let result = h.tracker.track(request("alice", "not-a-wallet")).await;
        assert!(matches!(result, Err(AppError::InvalidAddress(_))));
        assert_eq!(h.chain.subscribe_calls(), 0);
    }

    #[tokio::test]
    async fn test_untrack_without_tracking() {
        let h = harness();
        let outcome = h.tracker.untrack(&UserId::new("nobody")).await.unwrap();
        assert_eq!(outcome, UntrackOutcome::NotTracking);
    }

    #[tokio::test]
    async fn test_channel_request_persisted_with_route() {
        let h = harness();
        let mut req = request("alice", WALLET_A);
        req.channel_id = Some("trades".to_string());
        h.tracker.track(req).await.unwrap();

        let stored = h.store.find_by_user(&UserId::new("alice")).await.unwrap().unwrap();
        assert!(!stored.is_direct_message);
        assert_eq!(stored.channel_id.as_deref(), Some("trades"));
        let target = h.tracker.pipeline.recipients.get(&UserId::new("alice")).unwrap().clone();
        assert_eq!(target.route, Route::Channel("trades".to_string()));
    }

    #[tokio::test]
    async fn test_unresolvable_channel_fails_before_subscribing() {
        let h = harness_with(
            FakeTransport::new().reject_channel("gone", ResolveError::TargetNotFound("gone".to_string())),
        );
        let mut req = request("alice", WALLET_A);
        req.channel_id = Some("gone".to_string());

        let result = h.tracker.track(req).await;
        assert!(matches!(result, Err(AppError::Resolve(ResolveError::TargetNotFound(_)))));
        assert_eq!(h.chain.subscribe_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_retried_with_fixed_delay() {
        let h = harness();
        h.chain.fail_next_subscribes(2);

        let started = Instant::now();
        let outcome = h.tracker.track(request("alice", WALLET_A)).await.unwrap();

        assert!(matches!(outcome, TrackOutcome::Started { .. }));
        assert_eq!(h.chain.subscribe_calls(), 3);
        assert!(started.elapsed() >= Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_gives_up() {
        let h = harness();
        h.chain.fail_next_subscribes(3);

        let result = h.tracker.track(request("alice", WALLET_A)).await;
        assert!(matches!(result, Err(AppError::Blockchain(ChainError::Subscription(_)))));
        assert!(h.tracker.status().is_empty());
        assert!(h.store.find_by_user(&UserId::new("alice")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_reaches_every_subscriber() {
        let h = harness();
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();
        h.tracker.track(request("bob", WALLET_A)).await.unwrap();

        h.chain.set_signatures(WALLET_A, vec!["S1"]);
        h.chain.insert_transaction(arb("S1"));
        assert_eq!(h.chain.push(WALLET_A, 1), 1);

        wait_for_deliveries(&h.sink, 2).await;
        assert_eq!(h.sink.signatures(), vec!["S1", "S1"]);
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let h = harness();
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();
        h.tracker.track(request("bob", WALLET_B)).await.unwrap();

        h.tracker.shutdown().await;
        assert_eq!(h.chain.live_handles(), 0);
        assert_eq!(h.chain.unsubscribed().len(), 2);
        // Persisted rows survive for the next restore
        assert_eq!(h.store.list_all_subscriptions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_tracks_by_one_user() {
        let h = harness();

        let (a, b) = tokio::join!(
            h.tracker.track(request("alice", WALLET_A)),
            h.tracker.track(request("alice", WALLET_B))
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let already = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, TrackOutcome::AlreadyTracking(_)))
            .count();
        assert_eq!(already, 1);
        assert_eq!(h.chain.subscribe_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_does_not_block_other_addresses() {
        let h = harness();
        h.chain.fail_next_subscribes_for(WALLET_A, 2);

        let started = Instant::now();
        let (slow, fast) = tokio::join!(
            async {
                let outcome = h.tracker.track(request("alice", WALLET_A)).await;
                (outcome, started.elapsed())
            },
            async {
                let outcome = h.tracker.track(request("bob", WALLET_B)).await;
                (outcome, started.elapsed())
            }
        );

        assert!(slow.0.is_ok() && fast.0.is_ok());
        assert!(slow.1 >= Duration::from_millis(10_000));
        assert!(fast.1 < Duration::from_millis(1_000));
        assert_eq!(h.chain.subscribe_calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_store_write_leaves_user_untracked() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("missing").join("subs.json"))
            .await
            .unwrap();
        let h = harness_on(FakeTransport::new(), Arc::new(store));

        // A second attempt must fail the same way, not report the user as tracking
        for _ in 0..2 {
            let result = h.tracker.track(request("alice", WALLET_A)).await;
            assert!(matches!(result, Err(AppError::Store(_))));
        }
        assert!(h.tracker.status().is_empty());
        assert_eq!(h.chain.live_handles(), 0);
        assert_eq!(h.chain.subscribe_calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_untrack_keeps_stream() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let store = JsonFileStore::open(nested.join("subs.json")).await.unwrap();
        let h = harness_on(FakeTransport::new(), Arc::new(store));
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();

        std::fs::remove_dir_all(&nested).unwrap();
        let result = h.tracker.untrack(&UserId::new("alice")).await;

        assert!(matches!(result, Err(AppError::Store(_))));
        assert_eq!(h.chain.live_handles(), 1);
        assert_eq!(h.tracker.status().len(), 1);
        assert!(h.store.find_by_user(&UserId::new("alice")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_closed_stream_resubscribed_with_same_ledger() {
        let h = harness();
        let address = TrackedAddress::new_unchecked(WALLET_A);
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();

        h.chain.set_signatures(WALLET_A, vec!["S1"]);
        h.chain.insert_transaction(arb("S1"));
        assert_eq!(h.chain.push(WALLET_A, 1), 1);
        wait_for_deliveries(&h.sink, 1).await;

        assert_eq!(h.chain.drop_listener(WALLET_A), 1);
        assert_eq!(h.tracker.recover_next().await, Some(address.clone()));

        let status = h.tracker.status();
        assert_eq!(status[0].handle, PushHandle(101));
        assert_eq!(status[0].subscribers, 1);
        assert_eq!(h.chain.subscribe_calls(), 2);
        assert_eq!(h.chain.live_handles(), 1);
        assert_eq!(h.store.push_handle(&address).await.unwrap(), Some(PushHandle(101)));

        // S1 was already delivered before the stream closed
        h.chain.set_signatures(WALLET_A, vec!["S2", "S1"]);
        h.chain.insert_transaction(arb("S2"));
        assert_eq!(h.chain.push(WALLET_A, 2), 1);
        wait_for_deliveries(&h.sink, 2).await;
        assert_eq!(h.sink.signatures(), vec!["S1", "S2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_tried_again_after_giving_up() {
        let h = harness();
        h.tracker.track(request("alice", WALLET_A)).await.unwrap();
        h.chain.fail_next_subscribes_for(WALLET_A, 3);
        h.chain.drop_listener(WALLET_A);

        h.tracker.recover_next().await;
        assert_eq!(h.chain.live_handles(), 0);
        assert_eq!(h.tracker.status()[0].handle, PushHandle(100));

        h.tracker.recover_next().await;
        assert_eq!(h.chain.live_handles(), 1);
        assert_eq!(h.tracker.status()[0].handle, PushHandle(101));
        assert_eq!(h.chain.subscribe_calls(), 5);
    }
}
