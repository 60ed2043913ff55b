//! Client core for the real-time inquiry negotiation channel.
//!
//! A [`ChatSession`] owns one authenticated pub/sub connection per logged-in
//! user, re-establishes the five per-user queues on every reconnect, decodes
//! inbound frames into typed events, and fans them out to registered
//! callbacks. Outbound commands (chat sends, typing indicators, the purchase
//! handshake, mark-read) are fire-and-forget and report delivery with a
//! boolean; nothing is queued while disconnected.
//!
//! Sessions are constructed explicitly (create at login, disconnect at
//! logout) and passed by handle to whatever view needs them; there is no
//! process-wide singleton.

pub mod board;
pub mod config;
pub mod events;
pub mod rest;
pub mod session;
pub mod typing;
pub mod unread;

pub use board::{NegotiationBoard, PendingPurchase};
pub use config::SessionConfig;
pub use events::{Callbacks, Subscription};
pub use rest::ChatApi;
pub use session::{ChatSession, SessionError};
pub use typing::TypingTracker;
pub use unread::UnreadTracker;
