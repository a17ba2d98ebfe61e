//! Subscription domain - who is listening to which address

pub mod registry;

pub use registry::{Subscription, SubscriptionRegistry, Unsubscribed};
