use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::serde::rfc3339;

/// Lifecycle state of an inquiry (kept in sync with the server's enum).
///
/// ```
/// use estate_core::InquiryStatus;
///
/// let s = InquiryStatus::Negotiating;
/// assert_eq!(s.as_str(), "NEGOTIATING");
/// assert!(!s.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatus {
    Active,
    Negotiating,
    Agreed,
    Purchased,
    Cancelled,
    Closed,
}

impl InquiryStatus {
    /// Returns the wire identifier used in payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Active => "ACTIVE",
            InquiryStatus::Negotiating => "NEGOTIATING",
            InquiryStatus::Agreed => "AGREED",
            InquiryStatus::Purchased => "PURCHASED",
            InquiryStatus::Cancelled => "CANCELLED",
            InquiryStatus::Closed => "CLOSED",
        }
    }
}

/// Kind of a chat message inside an inquiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Text,
    PriceOffer,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "TEXT",
            MessageKind::PriceOffer => "PRICE_OFFER",
            MessageKind::System => "SYSTEM",
        }
    }
}

/// One negotiation thread between a buyer and a property owner.
///
/// The persistence collaborator is the system of record; clients hold a
/// read-through projection that is overwritten by inbound status updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: i64,
    pub property_id: i64,
    pub buyer_id: i64,
    pub owner_id: i64,
    pub status: InquiryStatus,
    #[serde(default)]
    pub offered_price: Option<f64>,
    #[serde(default)]
    pub agreed_price: Option<f64>,
    #[serde(with = "rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One unit of communication inside an inquiry, as delivered on the
/// per-user message queue.
///
/// Immutable once created except for `is_read`, which only ever moves
/// false -> true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub inquiry_id: i64,
    pub sender_id: i64,
    pub message_type: MessageKind,
    pub content: String,
    #[serde(default)]
    pub price_amount: Option<f64>,
    #[serde(with = "rfc3339")]
    pub sent_at: OffsetDateTime,
    #[serde(default)]
    pub is_read: bool,
}

/// Ephemeral typing signal. Never persisted, only forwarded live; receivers
/// apply a local expiry since no stop-on-timeout signal exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub inquiry_id: i64,
    pub sender_id: i64,
    pub is_typing: bool,
}

/// Inbound update on the per-user status queue. The server is authoritative;
/// the local projection always yields to this.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InquiryStatusUpdate {
    pub inquiry_id: i64,
    pub status: InquiryStatus,
    #[serde(default)]
    pub offered_price: Option<f64>,
    #[serde(default)]
    pub agreed_price: Option<f64>,
}

/// Direction of a purchase handshake event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseEventKind {
    Requested,
    Confirmed,
}

/// Inbound event on the per-user purchase queue: one leg of the two-step
/// handshake that finalizes a sale once a price is AGREED.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEvent {
    pub event: PurchaseEventKind,
    pub inquiry_id: i64,
    pub initiator_id: i64,
    #[serde(default)]
    pub final_price: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Inbound notification on the per-user notification queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub inquiry_id: Option<i64>,
}

/// Per-inquiry slice of the unread summary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InquiryUnread {
    pub inquiry_id: i64,
    pub unread: u64,
}

/// Response shape of the unread-count summary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UnreadSummary {
    pub total_unread: u64,
    #[serde(default)]
    pub per_inquiry: Vec<InquiryUnread>,
}
