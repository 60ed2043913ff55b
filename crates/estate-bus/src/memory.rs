//! Scriptable in-memory transport used in tests.
//!
//! Tests can inject inbound frames per subject, inspect everything that was
//! published, sever the live connection, and make upcoming dials fail or
//! hang.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Notify, broadcast};

use crate::{ConnectAuth, Frame, FrameStream, Transport, TransportConn, TransportError};

#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    fail_connects: AtomicUsize,
    hang_connects: AtomicBool,
    dials: Mutex<Vec<ConnectAuth>>,
    current: Mutex<Option<Arc<MemoryConn>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` dials fail with a connect error.
    pub fn fail_next_connects(&self, n: usize) {
        self.inner.fail_connects.store(n, Ordering::SeqCst);
    }

    /// Makes every future dial fail.
    pub fn fail_all_connects(&self) {
        self.fail_next_connects(usize::MAX);
    }

    /// Makes dials hang forever (for connect-timeout scenarios).
    pub fn hang_connects(&self, hang: bool) {
        self.inner.hang_connects.store(hang, Ordering::SeqCst);
    }

    /// Number of dials attempted so far.
    pub fn dial_count(&self) -> usize {
        self.inner.dials.lock().unwrap().len()
    }

    /// Credentials presented on each dial, in order.
    pub fn dials(&self) -> Vec<ConnectAuth> {
        self.inner.dials.lock().unwrap().clone()
    }

    /// The most recently established connection, if any.
    pub fn current(&self) -> Option<Arc<MemoryConn>> {
        self.inner.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, auth: &ConnectAuth) -> Result<Arc<dyn TransportConn>, TransportError> {
        self.inner.dials.lock().unwrap().push(auth.clone());
        if self.inner.hang_connects.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let scripted_failure = self
            .inner
            .fail_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n > 0).then(|| n.saturating_sub(1))
            })
            .is_ok();
        if scripted_failure {
            return Err(TransportError::Connect(anyhow::anyhow!(
                "scripted connect failure"
            )));
        }
        let conn = Arc::new(MemoryConn::default());
        *self.inner.current.lock().unwrap() = Some(conn.clone());
        Ok(conn)
    }
}

#[derive(Default)]
pub struct MemoryConn {
    published: Mutex<Vec<(String, Bytes)>>,
    topics: Mutex<HashMap<String, broadcast::Sender<Frame>>>,
    severed: AtomicBool,
    lost: Notify,
}

impl MemoryConn {
    /// Delivers a JSON payload on `subject`. Returns `false` when nothing is
    /// subscribed to the subject.
    pub fn inject(&self, subject: &str, payload: &serde_json::Value) -> bool {
        let bytes = serde_json::to_vec(payload).unwrap_or_default();
        self.inject_raw(subject, Bytes::from(bytes))
    }

    /// Delivers raw bytes on `subject` (for malformed-frame scenarios).
    pub fn inject_raw(&self, subject: &str, payload: Bytes) -> bool {
        let topics = self.topics.lock().unwrap();
        match topics.get(subject) {
            Some(tx) => {
                let frame = Frame {
                    subject: subject.to_string(),
                    payload,
                };
                tx.send(frame).is_ok()
            }
            None => false,
        }
    }

    /// Everything published over this connection, in order.
    pub fn published(&self) -> Vec<(String, Bytes)> {
        self.published.lock().unwrap().clone()
    }

    /// Published frames decoded as JSON, for assertions.
    pub fn published_json(&self) -> Vec<(String, serde_json::Value)> {
        self.published()
            .into_iter()
            .filter_map(|(subject, bytes)| {
                serde_json::from_slice(&bytes).ok().map(|v| (subject, v))
            })
            .collect()
    }

    /// Subjects currently subscribed on this connection.
    pub fn subscribed_subjects(&self) -> Vec<String> {
        let mut subjects: Vec<String> = self.topics.lock().unwrap().keys().cloned().collect();
        subjects.sort();
        subjects
    }

    /// Severs the connection: subscription streams end and `closed` resolves.
    pub fn sever(&self) {
        self.severed.store(true, Ordering::SeqCst);
        self.topics.lock().unwrap().clear();
        self.lost.notify_waiters();
    }

    pub fn is_severed(&self) -> bool {
        self.severed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportConn for MemoryConn {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        if self.is_severed() {
            return Err(TransportError::Publish(anyhow::anyhow!(
                "connection severed"
            )));
        }
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<FrameStream, TransportError> {
        if self.is_severed() {
            return Err(TransportError::Subscribe(anyhow::anyhow!(
                "connection severed"
            )));
        }
        let mut rx = {
            let mut topics = self.topics.lock().unwrap();
            topics
                .entry(subject.to_string())
                .or_insert_with(|| broadcast::channel(256).0)
                .subscribe()
        };
        Ok(Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(frame) => yield frame,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }))
    }

    async fn close(&self) {
        self.sever();
    }

    async fn closed(&self) {
        loop {
            let notified = self.lost.notified();
            if self.is_severed() {
                return;
            }
            notified.await;
        }
    }
}
