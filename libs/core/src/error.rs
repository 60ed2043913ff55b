use crate::types::{InquiryStatus, MessageKind};

/// Client-side protocol violations. These are caught at the point of the
/// offending command or frame; they never escape to UI code as panics.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("price offer requires a price amount")]
    MissingPrice,
    #[error("{} messages cannot carry a price amount", .kind.as_str())]
    UnexpectedPrice { kind: MessageKind },
    #[error("invalid inquiry transition {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: InquiryStatus,
        to: InquiryStatus,
    },
    #[error("inquiry {inquiry_id} is {} but the purchase handshake requires AGREED", .status.as_str())]
    PurchaseNotPermitted {
        inquiry_id: i64,
        status: InquiryStatus,
    },
    #[error("no outstanding counterparty purchase request for inquiry {inquiry_id}")]
    NoPendingRequest { inquiry_id: i64 },
    #[error("inquiry {inquiry_id}: a party cannot confirm its own purchase request")]
    OwnRequest { inquiry_id: i64 },
    #[error("unknown inquiry {inquiry_id}")]
    UnknownInquiry { inquiry_id: i64 },
}
