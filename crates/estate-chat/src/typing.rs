//! TTL-expiring typing tracker.
//!
//! The protocol carries no stop-on-timeout signal, so a typist who never
//! sends `isTyping=false` is considered stopped once the TTL elapses without
//! a refresh. An explicit `false` clears immediately.

use std::time::Duration;

use dashmap::DashMap;
use estate_core::TypingSignal;
use tokio::time::Instant;

pub struct TypingTracker {
    ttl: Duration,
    active: DashMap<(i64, i64), Instant>,
}

impl TypingTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            active: DashMap::new(),
        }
    }

    pub fn observe(&self, signal: &TypingSignal) {
        let key = (signal.inquiry_id, signal.sender_id);
        if signal.is_typing {
            self.active.insert(key, Instant::now());
        } else {
            self.active.remove(&key);
        }
    }

    /// Users currently typing in `inquiry_id`, expired entries pruned.
    pub fn typists(&self, inquiry_id: i64) -> Vec<i64> {
        let now = Instant::now();
        self.active
            .retain(|_, seen| now.saturating_duration_since(*seen) < self.ttl);
        let mut users: Vec<i64> = self
            .active
            .iter()
            .filter(|entry| entry.key().0 == inquiry_id)
            .map(|entry| entry.key().1)
            .collect();
        users.sort_unstable();
        users
    }

    pub fn is_typing(&self, inquiry_id: i64, user_id: i64) -> bool {
        self.typists(inquiry_id).contains(&user_id)
    }
}
