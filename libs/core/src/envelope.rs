//! Outbound wire envelopes published to the per-inquiry destinations.
//!
//! Field names follow the server contract exactly (camelCase, explicit
//! `null` for an absent price so receivers can distinguish "no price" from a
//! truncated payload).

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::MessageKind;

/// Chat send envelope.
///
/// ```
/// use estate_core::{ChatSend, MessageKind};
///
/// let env = ChatSend::new(42, "Is this available?", MessageKind::Text, None).unwrap();
/// let v = serde_json::to_value(&env).unwrap();
/// assert_eq!(v["type"], "CHAT_MESSAGE");
/// assert_eq!(v["inquiryId"], 42);
/// assert!(v["priceAmount"].is_null());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "type", rename = "CHAT_MESSAGE")]
pub struct ChatSend {
    pub inquiry_id: i64,
    pub content: String,
    pub message_type: MessageKind,
    pub price_amount: Option<f64>,
}

impl ChatSend {
    /// Builds a chat send envelope, enforcing the price invariant: a
    /// PRICE_OFFER always carries an amount, a plain TEXT message never does.
    pub fn new(
        inquiry_id: i64,
        content: impl Into<String>,
        message_type: MessageKind,
        price_amount: Option<f64>,
    ) -> Result<Self, ProtocolError> {
        match (message_type, price_amount) {
            (MessageKind::PriceOffer, None) => return Err(ProtocolError::MissingPrice),
            (MessageKind::Text, Some(_)) | (MessageKind::System, Some(_)) => {
                return Err(ProtocolError::UnexpectedPrice { kind: message_type });
            }
            _ => {}
        }
        Ok(Self {
            inquiry_id,
            content: content.into(),
            message_type,
            price_amount,
        })
    }
}

/// Typing indicator envelope. No state effect, purely presentational.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicator {
    pub inquiry_id: i64,
    pub is_typing: bool,
}

/// Buyer's purchase request, valid only while the inquiry is AGREED.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseProposal {
    pub inquiry_id: i64,
    pub final_price: f64,
    pub message: Option<String>,
}

/// Counterparty's confirmation of an outstanding purchase request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseConfirm {
    pub inquiry_id: i64,
    pub message: Option<String>,
}

/// Mark-read envelope, idempotent server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarkRead {
    pub inquiry_id: i64,
}
