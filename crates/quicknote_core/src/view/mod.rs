//! View controllers: in-memory state between UI events and the service.
//!
//! # Invariants
//! - Controller state is a disposable mirror; the backend stays the only
//!   authority and every reload rebuilds the mirror from scratch.
//! - Concurrent editors on one note are last-write-wins.

pub mod editor;
pub mod list;
