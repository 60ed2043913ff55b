//! Per-inquiry unread tracking.
//!
//! Counts only messages sent by counterparties. `clear` is the sole way
//! down: unread state is monotonic and clearing an already-read inquiry is a
//! no-op.

use dashmap::DashMap;
use estate_core::{ChatMessage, UnreadSummary};

#[derive(Default)]
pub struct UnreadTracker {
    counts: DashMap<i64, u64>,
}

impl UnreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds counts from the unread-summary read.
    pub fn prime(&self, summary: &UnreadSummary) {
        for slice in &summary.per_inquiry {
            self.counts.insert(slice.inquiry_id, slice.unread);
        }
    }

    /// Records an inbound message. Own messages (multi-device echo) and
    /// messages already flagged read do not count.
    pub fn record_inbound(&self, message: &ChatMessage, user_id: i64) -> bool {
        if message.sender_id == user_id || message.is_read {
            return false;
        }
        *self.counts.entry(message.inquiry_id).or_insert(0) += 1;
        true
    }

    pub fn unread_for(&self, inquiry_id: i64) -> u64 {
        self.counts.get(&inquiry_id).map(|c| *c).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Clears an inquiry's unread count, returning what was cleared.
    pub fn clear(&self, inquiry_id: i64) -> u64 {
        self.counts.remove(&inquiry_id).map(|(_, n)| n).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::{InquiryUnread, MessageKind};
    use time::OffsetDateTime;

    fn message(inquiry_id: i64, sender_id: i64) -> ChatMessage {
        ChatMessage {
            id: 1,
            inquiry_id,
            sender_id,
            message_type: MessageKind::Text,
            content: "hi".into(),
            price_amount: None,
            sent_at: OffsetDateTime::UNIX_EPOCH,
            is_read: false,
        }
    }

    #[test]
    fn own_messages_do_not_count() {
        let tracker = UnreadTracker::new();
        assert!(!tracker.record_inbound(&message(1, 7), 7));
        assert!(tracker.record_inbound(&message(1, 2), 7));
        assert_eq!(tracker.unread_for(1), 1);
        assert_eq!(tracker.total(), 1);
    }

    #[test]
    fn clear_is_idempotent() {
        let tracker = UnreadTracker::new();
        tracker.record_inbound(&message(5, 2), 7);
        tracker.record_inbound(&message(5, 2), 7);
        assert_eq!(tracker.clear(5), 2);
        assert_eq!(tracker.clear(5), 0);
        assert_eq!(tracker.unread_for(5), 0);
    }

    #[test]
    fn prime_from_summary() {
        let tracker = UnreadTracker::new();
        tracker.prime(&UnreadSummary {
            total_unread: 3,
            per_inquiry: vec![
                InquiryUnread {
                    inquiry_id: 1,
                    unread: 2,
                },
                InquiryUnread {
                    inquiry_id: 2,
                    unread: 1,
                },
            ],
        });
        assert_eq!(tracker.total(), 3);
        assert_eq!(tracker.unread_for(2), 1);
    }
}
