//! Inquiry state machine.
//!
//! Transitions are driven only by protocol events; the persistence
//! collaborator is authoritative and inbound status updates always replace
//! the local value. The table here is used to gate outbound commands and to
//! reject stale inbound purchase frames.

use crate::error::ProtocolError;
use crate::types::InquiryStatus;

impl InquiryStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InquiryStatus::Purchased | InquiryStatus::Cancelled | InquiryStatus::Closed
        )
    }

    /// Only AGREED permits the purchase request/confirmation handshake.
    pub fn permits_purchase(&self) -> bool {
        matches!(self, InquiryStatus::Agreed)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// ```
    /// use estate_core::InquiryStatus::*;
    ///
    /// assert!(Active.can_transition_to(Negotiating));
    /// assert!(Agreed.can_transition_to(Purchased));
    /// assert!(!Negotiating.can_transition_to(Purchased));
    /// assert!(!Purchased.can_transition_to(Active));
    /// ```
    pub fn can_transition_to(&self, next: InquiryStatus) -> bool {
        use InquiryStatus::*;
        matches!(
            (self, next),
            (Active, Negotiating)
                | (Active, Cancelled)
                | (Active, Closed)
                | (Negotiating, Agreed)
                | (Negotiating, Cancelled)
                | (Negotiating, Closed)
                | (Agreed, Purchased)
                | (Agreed, Cancelled)
        )
    }

    /// Validates a transition, for callers that want the reason.
    pub fn transition_to(&self, next: InquiryStatus) -> Result<InquiryStatus, ProtocolError> {
        if *self == next || self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ProtocolError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}
