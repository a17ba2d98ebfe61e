//! Bounded record of signatures already classified for one address

use std::collections::{HashSet, VecDeque};

/// Insertion-ordered signature set trimmed oldest-first
#[derive(Debug, Clone)]
pub struct ProcessedSignatureLedger {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl ProcessedSignatureLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.seen.contains(signature)
    }

    /// Record a signature; returns false if it was already present
    pub fn mark_processed(&mut self, signature: &str) -> bool {
        if !self.seen.insert(signature.to_string()) {
            return false;
        }
        self.order.push_back(signature.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
