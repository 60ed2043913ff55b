//! Estate chat core contracts and value types.
//!
//! This crate exposes the data structures exchanged over the negotiation
//! channel between buyers and property owners, the subject naming helpers for
//! the per-user queues and per-inquiry destinations, and the inquiry state
//! machine the protocol drives.

pub mod envelope;
pub mod error;
pub mod state;
pub mod subjects;
pub mod types;

pub use envelope::*;
pub use error::*;
pub use subjects::*;
pub use types::*;
