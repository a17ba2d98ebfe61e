//! Reference-counted registry of tracked addresses

use crate::shared::types::{PushHandle, TrackedAddress, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One live chain subscription and everyone listening to it
#[derive(Debug, Clone)]
pub struct Subscription {
    pub address: TrackedAddress,
    pub handle: PushHandle,
    pub subscribers: HashSet<UserId>,
}

/// Result of removing a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsubscribed {
    /// Address was not tracked or the user was not subscribed to it
    NotSubscribed,
    /// Other subscribers remain, the handle stays alive
    Remaining(usize),
    /// Last subscriber left; the caller must tear down this handle
    Released(PushHandle),
}

/// Address -> subscription map shared by the ingestion loop and command handlers
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: DashMap<TrackedAddress, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user` to `address`.
    ///
    /// `handle` is only recorded when the address has no live subscription yet;
    /// otherwise the existing handle is returned and no new chain subscription
    /// should be kept by the caller.
    pub fn subscribe(&self, address: &TrackedAddress, user: &UserId, handle: PushHandle) -> PushHandle {
        match self.entries.entry(address.clone()) {
            Entry::Occupied(mut occupied) => {
                let subscription = occupied.get_mut();
                subscription.subscribers.insert(user.clone());
                debug!(
                    "Joined existing subscription {} for {} ({} subscribers)",
                    subscription.handle,
                    address,
                    subscription.subscribers.len()
                );
                subscription.handle
            }
            Entry::Vacant(vacant) => {
                let mut subscribers = HashSet::new();
                subscribers.insert(user.clone());
                vacant.insert(Subscription {
                    address: address.clone(),
                    handle,
                    subscribers,
                });
                debug!("Registered subscription {} for {}", handle, address);
                handle
            }
        }
    }

    /// Remove `user` from `address`, dropping the entry when it empties
    pub fn unsubscribe(&self, address: &TrackedAddress, user: &UserId) -> Unsubscribed {
        let Entry::Occupied(mut occupied) = self.entries.entry(address.clone()) else {
            warn!("No subscription found for wallet: {}", address);
            return Unsubscribed::NotSubscribed;
        };

        if !occupied.get_mut().subscribers.remove(user) {
            warn!("User {} is not subscribed to wallet: {}", user, address);
            return Unsubscribed::NotSubscribed;
        }

        let remaining = occupied.get().subscribers.len();
        if remaining == 0 {
            let subscription = occupied.remove();
            Unsubscribed::Released(subscription.handle)
        } else {
            Unsubscribed::Remaining(remaining)
        }
    }

    /// Point `address` at a replacement chain subscription, keeping its subscribers.
    /// Returns false when the address is no longer tracked.
    pub fn rebind(&self, address: &TrackedAddress, handle: PushHandle) -> bool {
        match self.entries.get_mut(address) {
            Some(mut entry) => {
                debug!("Subscription for {} moved {} -> {}", address, entry.handle, handle);
                entry.handle = handle;
                true
            }
            None => false,
        }
    }

    pub fn is_tracked(&self, address: &TrackedAddress) -> bool {
        self.entries.contains_key(address)
    }

    pub fn subscriber_count(&self, address: &TrackedAddress) -> usize {
        self.entries.get(address).map(|entry| entry.subscribers.len()).unwrap_or(0)
    }

    pub fn handle_of(&self, address: &TrackedAddress) -> Option<PushHandle> {
        self.entries.get(address).map(|entry| entry.handle)
    }

    pub fn subscribers(&self, address: &TrackedAddress) -> Vec<UserId> {
        self.entries
            .get(address)
            .map(|entry| entry.subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn tracked_addresses(&self) -> Vec<TrackedAddress> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
