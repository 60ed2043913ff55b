//! Session lifecycle and subscription routing.
//!
//! One [`ChatSession`] holds one live connection per authenticated user. On
//! every successful connect (including reconnects) the five per-user queues
//! are re-subscribed; subscribers of the typed registries never re-subscribe
//! themselves. Outbound commands are fire-and-forget: they return `false`
//! while disconnected and nothing is queued for replay, so delivery is
//! at-most-once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use estate_bus::{ConnectAuth, Frame, FrameStream, Transport, TransportConn, TransportError};
use estate_core::{
    ChatMessage, ChatSend, Inquiry, InquiryStatusUpdate, MarkRead, MessageKind, Notification,
    PurchaseConfirm, PurchaseEvent, PurchaseProposal, TypingIndicator, TypingSignal, UserQueue,
    chat_confirm_purchase_subject, chat_mark_read_subject, chat_purchase_subject,
    chat_send_subject, chat_typing_subject, user_queue_subject,
};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::board::NegotiationBoard;
use crate::config::SessionConfig;
use crate::events::{EventRouter, Subscription};
use crate::typing::TypingTracker;
use crate::unread::UnreadTracker;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("connection not confirmed within {0:?}")]
    ConnectTimeout(Duration),
    #[error("connection attempt ended before confirmation")]
    ConnectFailed,
}

/// Owned negotiation-channel session. Create at login, disconnect (or drop)
/// at logout.
pub struct ChatSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    events: EventRouter,
    unread: UnreadTracker,
    typing: TypingTracker,
    board: NegotiationBoard,
    connected: AtomicBool,
    link: Mutex<LinkState>,
}

#[derive(Default)]
struct LinkState {
    auth: Option<ConnectAuth>,
    conn: Option<Arc<dyn TransportConn>>,
    task: Option<JoinHandle<()>>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let typing = TypingTracker::new(config.typing_ttl);
        Self {
            inner: Arc::new(SessionInner {
                transport,
                config,
                events: EventRouter::default(),
                unread: UnreadTracker::new(),
                typing,
                board: NegotiationBoard::new(),
                connected: AtomicBool::new(false),
                link: Mutex::new(LinkState::default()),
            }),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn unread(&self) -> &UnreadTracker {
        &self.inner.unread
    }

    pub fn typing(&self) -> &TypingTracker {
        &self.inner.typing
    }

    pub fn board(&self) -> &NegotiationBoard {
        &self.inner.board
    }

    /// Seeds the negotiation board from fetched inquiries.
    pub fn prime_inquiries(&self, inquiries: &[Inquiry]) {
        self.inner.board.prime(inquiries);
    }

    /// Seeds unread counts from the unread-summary read.
    pub fn prime_unread(&self, summary: &estate_core::UnreadSummary) {
        self.inner.unread.prime(summary);
    }

    // Event registration, one registry per category.

    pub fn on_message(
        &self,
        callback: impl Fn(&ChatMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.messages.subscribe(callback)
    }

    pub fn on_notification(
        &self,
        callback: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.notifications.subscribe(callback)
    }

    pub fn on_typing(
        &self,
        callback: impl Fn(&TypingSignal) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.typing.subscribe(callback)
    }

    pub fn on_status(
        &self,
        callback: impl Fn(&InquiryStatusUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.status.subscribe(callback)
    }

    pub fn on_purchase(
        &self,
        callback: impl Fn(&PurchaseEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.purchases.subscribe(callback)
    }

    pub fn on_connection_change(
        &self,
        callback: impl Fn(&bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.connection.subscribe(callback)
    }

    /// Opens the session. Idempotent while connected with the same
    /// credential and user; otherwise any existing connection is torn down
    /// first. Resolves once the connection is confirmed, or fails after the
    /// configured bound.
    pub async fn connect(&self, credential: &str, user_id: i64) -> Result<(), SessionError> {
        let auth = ConnectAuth {
            bearer: credential.to_string(),
            user_id,
        };
        let (confirm_tx, confirm_rx) = oneshot::channel();
        {
            let mut link = self.inner.link.lock().await;
            if self.is_connected() && link.auth.as_ref() == Some(&auth) {
                debug!(user_id, "already connected with same credentials");
                return Ok(());
            }
            if let Some(task) = link.task.take() {
                task.abort();
            }
            if let Some(conn) = link.conn.take() {
                conn.close().await;
            }
            if self.inner.connected.swap(false, Ordering::SeqCst) {
                self.inner.events.connection.dispatch(&false);
            }
            link.auth = Some(auth.clone());
            link.task = Some(tokio::spawn(run_link(
                self.inner.clone(),
                auth,
                confirm_tx,
            )));
        }
        match tokio::time::timeout(self.inner.config.connect_timeout, confirm_rx).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SessionError::ConnectFailed),
            Err(_) => Err(SessionError::ConnectTimeout(
                self.inner.config.connect_timeout,
            )),
        }
    }

    /// Tears the session down. Safe to call when not connected.
    pub async fn disconnect(&self) {
        let mut link = self.inner.link.lock().await;
        if let Some(task) = link.task.take() {
            task.abort();
        }
        if let Some(conn) = link.conn.take() {
            conn.close().await;
        }
        link.auth = None;
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            self.inner.events.connection.dispatch(&false);
        }
        info!("negotiation channel closed");
    }

    /// Fire-and-forget publish of an arbitrary payload. Returns `false`
    /// while disconnected; callers decide whether to surface a warning.
    pub async fn publish<T: Serialize>(&self, subject: &str, payload: &T) -> bool {
        self.inner.publish(subject, payload).await
    }

    /// Sends a chat message into an inquiry. A PRICE_OFFER must carry a
    /// price amount and a TEXT message must not; violations are rejected
    /// before anything reaches the wire.
    pub async fn send_message(
        &self,
        inquiry_id: i64,
        content: &str,
        kind: MessageKind,
        price_amount: Option<f64>,
    ) -> bool {
        let envelope = match ChatSend::new(inquiry_id, content, kind, price_amount) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(inquiry_id, error = %err, "rejecting chat send");
                return false;
            }
        };
        self.inner
            .publish(&chat_send_subject(inquiry_id), &envelope)
            .await
    }

    /// Sends a typing indicator. Purely presentational, no state effect.
    pub async fn send_typing_indicator(&self, inquiry_id: i64, is_typing: bool) -> bool {
        self.inner
            .publish(
                &chat_typing_subject(inquiry_id),
                &TypingIndicator {
                    inquiry_id,
                    is_typing,
                },
            )
            .await
    }

    /// Sends a purchase request. Valid only while the inquiry is AGREED.
    pub async fn send_purchase_request(
        &self,
        inquiry_id: i64,
        final_price: f64,
        message: Option<String>,
    ) -> bool {
        if let Err(err) = self.inner.board.check_purchase_request(inquiry_id) {
            warn!(inquiry_id, error = %err, "rejecting purchase request");
            return false;
        }
        self.inner
            .publish(
                &chat_purchase_subject(inquiry_id),
                &PurchaseProposal {
                    inquiry_id,
                    final_price,
                    message,
                },
            )
            .await
    }

    /// Confirms the counterparty's outstanding purchase request.
    pub async fn confirm_purchase(&self, inquiry_id: i64, message: Option<String>) -> bool {
        let user_id = {
            let link = self.inner.link.lock().await;
            link.auth.as_ref().map(|auth| auth.user_id)
        };
        let Some(user_id) = user_id else {
            warn!(inquiry_id, "cannot confirm purchase without a session identity");
            return false;
        };
        if let Err(err) = self.inner.board.check_confirmation(inquiry_id, user_id) {
            warn!(inquiry_id, error = %err, "rejecting purchase confirmation");
            return false;
        }
        self.inner
            .publish(
                &chat_confirm_purchase_subject(inquiry_id),
                &PurchaseConfirm {
                    inquiry_id,
                    message,
                },
            )
            .await
    }

    /// Marks an inquiry's messages read. Monotonic and idempotent: clearing
    /// an already-read inquiry is a no-op.
    pub async fn mark_messages_read(&self, inquiry_id: i64) -> bool {
        let sent = self
            .inner
            .publish(&chat_mark_read_subject(inquiry_id), &MarkRead { inquiry_id })
            .await;
        if sent {
            self.inner.unread.clear(inquiry_id);
        }
        sent
    }
}

impl SessionInner {
    async fn publish<T: Serialize>(&self, subject: &str, payload: &T) -> bool {
        let conn = { self.link.lock().await.conn.clone() };
        let Some(conn) = conn else {
            warn!(subject, "publish while disconnected; dropping");
            return false;
        };
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(subject, error = %err, "failed to encode payload");
                return false;
            }
        };
        match conn.publish(subject, Bytes::from(bytes)).await {
            Ok(()) => true,
            Err(err) => {
                warn!(subject, error = %err, "publish failed");
                false
            }
        }
    }
}

/// Connection driver: dial, wire the queues, confirm, then watch for loss
/// and retry with a linearly scaled delay up to the attempt ceiling.
async fn run_link(inner: Arc<SessionInner>, auth: ConnectAuth, confirm: oneshot::Sender<()>) {
    let mut confirm = Some(confirm);
    let mut attempts: u32 = 0;
    loop {
        match inner.transport.connect(&auth).await {
            Ok(conn) => match wire_subscriptions(&inner, &conn, auth.user_id).await {
                Ok(()) => {
                    attempts = 0;
                    {
                        inner.link.lock().await.conn = Some(conn.clone());
                    }
                    inner.connected.store(true, Ordering::SeqCst);
                    if let Some(tx) = confirm.take() {
                        let _ = tx.send(());
                    }
                    inner.events.connection.dispatch(&true);
                    info!(user_id = auth.user_id, "negotiation channel connected");

                    conn.closed().await;

                    inner.connected.store(false, Ordering::SeqCst);
                    {
                        inner.link.lock().await.conn = None;
                    }
                    inner.events.connection.dispatch(&false);
                    warn!(user_id = auth.user_id, "negotiation channel lost");
                }
                Err(err) => {
                    warn!(error = %err, "subscription setup failed");
                }
            },
            Err(err) => {
                warn!(error = %err, "connect failed");
            }
        }
        attempts += 1;
        if attempts > inner.config.max_reconnect_attempts {
            warn!(
                attempts = attempts - 1,
                "reconnect attempts exhausted; staying disconnected"
            );
            return;
        }
        let delay = inner.config.reconnect_delay * attempts;
        debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        tokio::time::sleep(delay).await;
    }
}

/// Re-establishes the five per-user queues on a fresh connection and spawns
/// one dispatcher per queue. Dispatchers end when their stream does (the
/// connection died), so stale dispatchers never outlive their connection.
async fn wire_subscriptions(
    inner: &Arc<SessionInner>,
    conn: &Arc<dyn TransportConn>,
    user_id: i64,
) -> Result<(), TransportError> {
    for queue in UserQueue::ALL {
        let stream = conn.subscribe(&user_queue_subject(user_id, queue)).await?;
        tokio::spawn(dispatch_queue(inner.clone(), queue, user_id, stream));
    }
    debug!(user_id, "subscribed to all user queues");
    Ok(())
}

async fn dispatch_queue(
    inner: Arc<SessionInner>,
    queue: UserQueue,
    user_id: i64,
    mut stream: FrameStream,
) {
    while let Some(frame) = stream.next().await {
        handle_frame(&inner, queue, user_id, &frame);
    }
    debug!(queue = queue.as_str(), "queue stream ended");
}

/// Decodes and routes one inbound frame. A decode failure is logged and
/// dropped; it must never take down the dispatch loop or other queues.
fn handle_frame(inner: &SessionInner, queue: UserQueue, user_id: i64, frame: &Frame) {
    match queue {
        UserQueue::Messages => {
            if let Some(message) = decode::<ChatMessage>(frame) {
                inner.unread.record_inbound(&message, user_id);
                inner.events.messages.dispatch(&message);
            }
        }
        UserQueue::Notifications => {
            if let Some(notification) = decode::<Notification>(frame) {
                inner.events.notifications.dispatch(&notification);
            }
        }
        UserQueue::Typing => {
            if let Some(signal) = decode::<TypingSignal>(frame) {
                inner.typing.observe(&signal);
                inner.events.typing.dispatch(&signal);
            }
        }
        UserQueue::Status => {
            if let Some(update) = decode::<InquiryStatusUpdate>(frame) {
                inner.board.apply_status(&update);
                inner.events.status.dispatch(&update);
            }
        }
        UserQueue::Purchase => {
            if let Some(event) = decode::<PurchaseEvent>(frame) {
                match inner.board.observe_purchase(&event) {
                    Ok(()) => inner.events.purchases.dispatch(&event),
                    Err(err) => {
                        warn!(inquiry_id = event.inquiry_id, error = %err, "dropping stale purchase frame");
                    }
                }
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(frame: &Frame) -> Option<T> {
    match serde_json::from_slice(&frame.payload) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(subject = %frame.subject, error = %err, "dropping undecodable frame");
            None
        }
    }
}
