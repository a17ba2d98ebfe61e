use super::{StoreState, SubscriptionStore};
use crate::shared::errors::StoreError;
use crate::shared::types::{PersistedSubscription, PushHandle, TrackedAddress, UserId};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Non-durable store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<PersistedSubscription>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                subscriptions,
                ..StoreState::default()
            }),
        }
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn list_all_subscriptions(&self) -> Result<Vec<PersistedSubscription>, StoreError> {
        Ok(self.state.lock().await.subscriptions.clone())
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Option<PersistedSubscription>, StoreError> {
        Ok(self.state.lock().await.find_by_user(user).cloned())
    }

    async fn upsert_subscription(&self, subscription: PersistedSubscription) -> Result<(), StoreError> {
        self.state.lock().await.upsert(subscription);
        Ok(())
    }

    async fn delete_subscription(&self, user: &UserId) -> Result<Option<PersistedSubscription>, StoreError> {
        Ok(self.state.lock().await.delete(user))
    }

    async fn update_push_handle(&self, address: &TrackedAddress, handle: PushHandle) -> Result<(), StoreError> {
        self.state.lock().await.set_push_handle(address, handle);
        Ok(())
    }

    async fn push_handle(&self, address: &TrackedAddress) -> Result<Option<PushHandle>, StoreError> {
        Ok(self.state.lock().await.push_handles.get(address).copied())
    }
}
