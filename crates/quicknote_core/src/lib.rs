//! Core logic for Quicknote.
//! Storage backends, change events and the list/editor controllers live
//! here; shells only supply host services.

pub mod config;
pub mod db;
pub mod events;
pub mod host;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod view;

pub use config::{AppConfig, ConfigError, ConfigResult};
pub use events::bus::{ChangeBus, NoteEvent, Subscription};
pub use events::feed::{RemoteChangeFeed, RowUpdate};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteId};
pub use repo::{open_repository, BackendConfig, NoteRepository, RepoError, RepoResult};
pub use service::note_service::{derive_preview, NoteService, NoteServiceError, ServiceResult};
pub use view::editor::{EditorController, EditorError, EditorOptions};
pub use view::list::ListController;

/// Minimal health-check API for shell wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Opens the configured backend and wraps it in a service with a fresh bus.
pub fn open_service(config: &AppConfig) -> RepoResult<NoteService> {
    let repo = open_repository(&config.backend)?;
    Ok(NoteService::new(repo, ChangeBus::default()))
}
