//! Change notification channels.
//!
//! # Responsibility
//! - `bus`: in-process typed publish/subscribe for note mutations.
//! - `feed`: decoding of row-level `UPDATE` pushes from the hosted backend.
//!
//! # Invariants
//! - Both channels are fire-and-forget; nothing is replayed for listeners
//!   that were not subscribed when an event happened.

pub mod bus;
pub mod feed;
