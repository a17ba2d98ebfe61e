//! Persistent subscription store

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::shared::errors::StoreError;
use crate::shared::types::{PersistedSubscription, PushHandle, TrackedAddress, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Durable record of who tracks what
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn list_all_subscriptions(&self) -> Result<Vec<PersistedSubscription>, StoreError>;

    async fn find_by_user(&self, user: &UserId) -> Result<Option<PersistedSubscription>, StoreError>;

    /// Insert, or replace the row with the same (user, address)
    async fn upsert_subscription(&self, subscription: PersistedSubscription) -> Result<(), StoreError>;

    /// Remove the user's row; drops the address's push handle once nobody tracks it
    async fn delete_subscription(&self, user: &UserId) -> Result<Option<PersistedSubscription>, StoreError>;

    async fn update_push_handle(&self, address: &TrackedAddress, handle: PushHandle) -> Result<(), StoreError>;

    async fn push_handle(&self, address: &TrackedAddress) -> Result<Option<PushHandle>, StoreError>;
}

/// In-memory table shared by the store implementations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    pub subscriptions: Vec<PersistedSubscription>,
    pub push_handles: BTreeMap<TrackedAddress, PushHandle>,
}

impl StoreState {
    pub fn find_by_user(&self, user: &UserId) -> Option<&PersistedSubscription> {
        self.subscriptions.iter().find(|s| &s.user_id == user)
    }

    pub fn upsert(&mut self, subscription: PersistedSubscription) {
        match self
            .subscriptions
            .iter_mut()
            .find(|s| s.user_id == subscription.user_id && s.address == subscription.address)
        {
            Some(existing) => *existing = subscription,
            None => self.subscriptions.push(subscription),
        }
    }

    pub fn delete(&mut self, user: &UserId) -> Option<PersistedSubscription> {
        let index = self.subscriptions.iter().position(|s| &s.user_id == user)?;
        let removed = self.subscriptions.remove(index);

        if !self.subscriptions.iter().any(|s| s.address == removed.address) {
            self.push_handles.remove(&removed.address);
        }
        Some(removed)
    }

    pub fn set_push_handle(&mut self, address: &TrackedAddress, handle: PushHandle) {
        self.push_handles.insert(address.clone(), handle);
    }
}
