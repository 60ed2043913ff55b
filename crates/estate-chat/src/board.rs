//! Client-side projection of negotiation state.
//!
//! The persistence collaborator is authoritative; this board is a
//! read-through cache used to gate outbound commands and to reject stale
//! inbound purchase frames. Inbound status updates always overwrite the
//! local value, even when the hop looks illegal from here (the server may
//! have seen intermediate transitions this client missed).

use dashmap::DashMap;
use estate_core::{
    Inquiry, InquiryStatus, InquiryStatusUpdate, ProtocolError, PurchaseEvent, PurchaseEventKind,
};
use tracing::debug;

/// An outstanding purchase request awaiting the counterparty's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPurchase {
    pub initiator_id: i64,
    pub final_price: Option<f64>,
}

#[derive(Debug, Clone)]
struct InquiryState {
    status: InquiryStatus,
    pending: Option<PendingPurchase>,
}

#[derive(Default)]
pub struct NegotiationBoard {
    inner: DashMap<i64, InquiryState>,
}

impl NegotiationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the board from fetched inquiries (e.g. the my-inquiries read).
    pub fn prime(&self, inquiries: &[Inquiry]) {
        for inquiry in inquiries {
            self.inner
                .entry(inquiry.id)
                .and_modify(|state| state.status = inquiry.status)
                .or_insert(InquiryState {
                    status: inquiry.status,
                    pending: None,
                });
        }
    }

    pub fn status(&self, inquiry_id: i64) -> Option<InquiryStatus> {
        self.inner.get(&inquiry_id).map(|state| state.status)
    }

    pub fn pending_request(&self, inquiry_id: i64) -> Option<PendingPurchase> {
        self.inner
            .get(&inquiry_id)
            .and_then(|state| state.pending.clone())
    }

    /// Applies a server status update. Server state always wins; leaving
    /// AGREED voids any outstanding purchase request.
    pub fn apply_status(&self, update: &InquiryStatusUpdate) {
        let mut entry = self.inner.entry(update.inquiry_id).or_insert(InquiryState {
            status: update.status,
            pending: None,
        });
        if entry.status != update.status && !entry.status.can_transition_to(update.status) {
            debug!(
                inquiry_id = update.inquiry_id,
                from = entry.status.as_str(),
                to = update.status.as_str(),
                "local status was stale; accepting server state"
            );
        }
        entry.status = update.status;
        if !entry.status.permits_purchase() {
            entry.pending = None;
        }
    }

    /// Gates an inbound purchase frame. Frames for inquiries not in AGREED
    /// (stale or duplicate after a state change) are rejected.
    pub fn observe_purchase(&self, event: &PurchaseEvent) -> Result<(), ProtocolError> {
        let mut entry =
            self.inner
                .get_mut(&event.inquiry_id)
                .ok_or(ProtocolError::UnknownInquiry {
                    inquiry_id: event.inquiry_id,
                })?;
        if !entry.status.permits_purchase() {
            return Err(ProtocolError::PurchaseNotPermitted {
                inquiry_id: event.inquiry_id,
                status: entry.status,
            });
        }
        match event.event {
            PurchaseEventKind::Requested => {
                entry.pending = Some(PendingPurchase {
                    initiator_id: event.initiator_id,
                    final_price: event.final_price,
                });
                Ok(())
            }
            PurchaseEventKind::Confirmed => {
                if entry.pending.is_none() {
                    return Err(ProtocolError::NoPendingRequest {
                        inquiry_id: event.inquiry_id,
                    });
                }
                entry.status = InquiryStatus::Purchased;
                entry.pending = None;
                Ok(())
            }
        }
    }

    /// Precondition for sending a purchase request: local status AGREED.
    pub fn check_purchase_request(&self, inquiry_id: i64) -> Result<(), ProtocolError> {
        match self.status(inquiry_id) {
            None => Err(ProtocolError::UnknownInquiry { inquiry_id }),
            Some(status) if status.permits_purchase() => Ok(()),
            Some(status) => Err(ProtocolError::PurchaseNotPermitted { inquiry_id, status }),
        }
    }

    /// Precondition for confirming: an outstanding request from the
    /// counterparty (a party cannot confirm its own request).
    pub fn check_confirmation(&self, inquiry_id: i64, user_id: i64) -> Result<(), ProtocolError> {
        self.check_purchase_request(inquiry_id)?;
        match self.pending_request(inquiry_id) {
            None => Err(ProtocolError::NoPendingRequest { inquiry_id }),
            Some(pending) if pending.initiator_id == user_id => {
                Err(ProtocolError::OwnRequest { inquiry_id })
            }
            Some(_) => Ok(()),
        }
    }
}
