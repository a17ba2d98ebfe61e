use super::{StoreState, SubscriptionStore};
use crate::shared::errors::StoreError;
use crate::shared::types::{PersistedSubscription, PushHandle, TrackedAddress, UserId};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Store backed by a single JSON document, rewritten on every change
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => StoreState::default(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "💾 Subscription store {} opened with {} subscriptions",
            path.display(),
            state.subscriptions.len()
        );
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Store written to {}", self.path.display());
        Ok(())
    }

    /// Apply `change` to a copy of the state; the copy replaces it only once written
    async fn commit<R, F>(&self, change: F) -> Result<R, StoreError>
    where
        R: Send,
        F: FnOnce(&mut StoreState) -> R + Send,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let output = change(&mut next);

        if next != *state {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(output)
    }
}

#[async_trait]
impl SubscriptionStore for JsonFileStore {
    async fn list_all_subscriptions(&self) -> Result<Vec<PersistedSubscription>, StoreError> {
        Ok(self.state.lock().await.subscriptions.clone())
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Option<PersistedSubscription>, StoreError> {
        Ok(self.state.lock().await.find_by_user(user).cloned())
    }

    async fn upsert_subscription(&self, subscription: PersistedSubscription) -> Result<(), StoreError> {
        self.commit(|state| state.upsert(subscription)).await
    }

    async fn delete_subscription(&self, user: &UserId) -> Result<Option<PersistedSubscription>, StoreError> {
        self.commit(|state| state.delete(user)).await
    }

    async fn update_push_handle(&self, address: &TrackedAddress, handle: PushHandle) -> Result<(), StoreError> {
        self.commit(|state| state.set_push_handle(address, handle)).await
    }

    async fn push_handle(&self, address: &TrackedAddress) -> Result<Option<PushHandle>, StoreError> {
        Ok(self.state.lock().await.push_handles.get(address).copied())
    }
}
