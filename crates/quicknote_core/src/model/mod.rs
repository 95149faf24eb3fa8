//! Note domain model.
//!
//! # Invariants
//! - A note is identified by one immutable `NoteId`.
//! - The backing store is the only authority; in-memory copies are caches.

pub mod note;
