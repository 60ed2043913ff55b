//! Subject helpers for the negotiation channel (per-user queues and
//! per-inquiry command destinations).

/// Prefix for per-user inbound queues.
pub const USER_SUBJECT_PREFIX: &str = "estate.chat.user";
/// Prefix for per-inquiry command destinations.
pub const APP_SUBJECT_PREFIX: &str = "estate.chat.app";

/// The five inbound queues established for every authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserQueue {
    Messages,
    Notifications,
    Typing,
    Status,
    Purchase,
}

impl UserQueue {
    /// All queues, in the order they are (re-)subscribed.
    pub const ALL: [UserQueue; 5] = [
        UserQueue::Messages,
        UserQueue::Notifications,
        UserQueue::Typing,
        UserQueue::Status,
        UserQueue::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserQueue::Messages => "messages",
            UserQueue::Notifications => "notifications",
            UserQueue::Typing => "typing",
            UserQueue::Status => "status",
            UserQueue::Purchase => "purchase",
        }
    }
}

/// Per-user inbound queue subject.
///
/// ```
/// use estate_core::{UserQueue, user_queue_subject};
///
/// assert_eq!(
///     user_queue_subject(17, UserQueue::Messages),
///     "estate.chat.user.17.messages"
/// );
/// ```
pub fn user_queue_subject(user_id: i64, queue: UserQueue) -> String {
    format!("{USER_SUBJECT_PREFIX}.{user_id}.{}", queue.as_str())
}

/// Destination for sending a chat message into an inquiry.
///
/// ```
/// use estate_core::chat_send_subject;
///
/// assert_eq!(chat_send_subject(42), "estate.chat.app.send.42");
/// ```
pub fn chat_send_subject(inquiry_id: i64) -> String {
    format!("{APP_SUBJECT_PREFIX}.send.{inquiry_id}")
}

/// Destination for typing indicators inside an inquiry.
pub fn chat_typing_subject(inquiry_id: i64) -> String {
    format!("{APP_SUBJECT_PREFIX}.typing.{inquiry_id}")
}

/// Destination for a buyer's purchase request.
pub fn chat_purchase_subject(inquiry_id: i64) -> String {
    format!("{APP_SUBJECT_PREFIX}.purchase.{inquiry_id}")
}

/// Destination for the counterparty's purchase confirmation.
pub fn chat_confirm_purchase_subject(inquiry_id: i64) -> String {
    format!("{APP_SUBJECT_PREFIX}.confirm-purchase.{inquiry_id}")
}

/// Destination for marking an inquiry's messages as read.
pub fn chat_mark_read_subject(inquiry_id: i64) -> String {
    format!("{APP_SUBJECT_PREFIX}.mark-read.{inquiry_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_format() {
        assert_eq!(
            user_queue_subject(7, UserQueue::Purchase),
            "estate.chat.user.7.purchase"
        );
        assert_eq!(chat_typing_subject(42), "estate.chat.app.typing.42");
        assert_eq!(
            chat_confirm_purchase_subject(42),
            "estate.chat.app.confirm-purchase.42"
        );
        assert_eq!(chat_mark_read_subject(9), "estate.chat.app.mark-read.9");
    }

    #[test]
    fn queue_order_is_stable() {
        let names: Vec<&str> = UserQueue::ALL.iter().map(|q| q.as_str()).collect();
        assert_eq!(
            names,
            ["messages", "notifications", "typing", "status", "purchase"]
        );
    }
}
