//! Persistence service shared by view controllers.
//!
//! # Responsibility
//! - Turn storage calls into use-case level operations with logging and
//!   change publication.
//! - Keep views independent of which backend is active.

pub mod note_service;
