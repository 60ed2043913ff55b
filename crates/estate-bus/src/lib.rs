//! Transport contract for the negotiation channel.
//!
//! A [`Transport`] dials one authenticated connection and hands back a
//! [`TransportConn`] that can publish frames, subscribe subjects, and report
//! when the connection is lost. Retry policy deliberately lives above this
//! seam, in the session, so the NATS implementation disables the client
//! library's own reconnection.

mod memory;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::Notify;
use tracing::debug;

pub use memory::{MemoryConn, MemoryTransport};

/// One inbound frame as delivered by the transport.
#[derive(Debug, Clone)]
pub struct Frame {
    pub subject: String,
    pub payload: Bytes,
}

/// Credentials attached to the connection handshake. The server identifies
/// the user from the bearer token; the user id scopes the queue subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAuth {
    pub bearer: String,
    pub user_id: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(#[source] anyhow::Error),
    #[error("publish failed: {0}")]
    Publish(#[source] anyhow::Error),
    #[error("subscribe failed: {0}")]
    Subscribe(#[source] anyhow::Error),
}

pub type FrameStream = BoxStream<'static, Frame>;

/// Dials authenticated connections.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, auth: &ConnectAuth) -> Result<Arc<dyn TransportConn>, TransportError>;
}

/// One live connection. Subscriptions die with the connection and must be
/// re-established by the caller after a reconnect.
#[async_trait]
pub trait TransportConn: Send + Sync {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError>;
    async fn subscribe(&self, subject: &str) -> Result<FrameStream, TransportError>;
    /// Actively terminates the connection; subscription streams end.
    async fn close(&self);
    /// Resolves once the connection has been lost.
    async fn closed(&self);
}

/// NATS-backed transport.
pub struct NatsTransport {
    url: String,
}

impl NatsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn connect(&self, auth: &ConnectAuth) -> Result<Arc<dyn TransportConn>, TransportError> {
        let lost = Arc::new(Notify::new());
        let lost_flag = Arc::new(AtomicBool::new(false));
        let cb_lost = lost.clone();
        let cb_flag = lost_flag.clone();

        let client = async_nats::ConnectOptions::new()
            .token(auth.bearer.clone())
            .max_reconnects(0)
            .event_callback(move |event| {
                let lost = cb_lost.clone();
                let flag = cb_flag.clone();
                async move {
                    if matches!(
                        event,
                        async_nats::Event::Disconnected | async_nats::Event::Closed
                    ) {
                        flag.store(true, Ordering::SeqCst);
                        lost.notify_waiters();
                    }
                }
            })
            .connect(&self.url)
            .await
            .map_err(|err| TransportError::Connect(anyhow::Error::new(err)))?;

        debug!(url = %self.url, user_id = auth.user_id, "nats connection established");
        Ok(Arc::new(NatsConn {
            client,
            lost,
            lost_flag,
        }))
    }
}

struct NatsConn {
    client: async_nats::Client,
    lost: Arc<Notify>,
    lost_flag: Arc<AtomicBool>,
}

#[async_trait]
impl TransportConn for NatsConn {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|err| TransportError::Publish(anyhow::Error::new(err)))
    }

    async fn subscribe(&self, subject: &str) -> Result<FrameStream, TransportError> {
        let sub = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|err| TransportError::Subscribe(anyhow::Error::new(err)))?;
        Ok(sub
            .map(|msg| Frame {
                subject: msg.subject.to_string(),
                payload: msg.payload,
            })
            .boxed())
    }

    async fn close(&self) {
        if let Err(err) = self.client.drain().await {
            debug!(error = %err, "drain on close failed");
        }
        self.lost_flag.store(true, Ordering::SeqCst);
        self.lost.notify_waiters();
    }

    async fn closed(&self) {
        loop {
            let notified = self.lost.notified();
            if self.lost_flag.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}
