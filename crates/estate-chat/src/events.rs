//! Typed callback registries.
//!
//! One registry per event category keeps subscriber isolation and ordering
//! explicit: subscribers run in registration order over a snapshot, a
//! panicking subscriber is caught and logged without stopping the rest, and
//! unsubscribing (dropping the [`Subscription`] guard) during a dispatch is
//! safe.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use estate_core::{ChatMessage, InquiryStatusUpdate, Notification, PurchaseEvent, TypingSignal};
use tracing::error;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Multi-subscriber registry for one event category.
pub struct Callbacks<T> {
    inner: Arc<CallbackList<T>>,
}

struct CallbackList<T> {
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(CallbackList {
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }
}

impl<T> Clone for Callbacks<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Callbacks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback`; dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));
        let list = self.inner.clone();
        Subscription {
            cancel: Some(Box::new(move || {
                list.subscribers.lock().unwrap().retain(|(i, _)| *i != id);
            })),
        }
    }

    /// Invokes all current subscribers in registration order. The list is
    /// snapshotted first, so mutation from inside a callback cannot poison
    /// the iteration.
    pub fn dispatch(&self, event: &T) {
        let snapshot: Vec<(u64, Callback<T>)> =
            self.inner.subscribers.lock().unwrap().clone();
        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(subscriber = id, "event subscriber panicked; continuing");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().unwrap().len()
    }
}

/// RAII unsubscribe guard returned by [`Callbacks::subscribe`].
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Keeps the callback registered for the registry's lifetime.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// The six event categories exposed by a session.
#[derive(Clone, Default)]
pub(crate) struct EventRouter {
    pub messages: Callbacks<ChatMessage>,
    pub notifications: Callbacks<Notification>,
    pub typing: Callbacks<TypingSignal>,
    pub status: Callbacks<InquiryStatusUpdate>,
    pub purchases: Callbacks<PurchaseEvent>,
    pub connection: Callbacks<bool>,
}
