//! Startup configuration.
//!
//! # Responsibility
//! - Choose the storage backend and editor behaviour once, at startup.
//! - Read settings from environment variables or a JSON document.
//!
//! # Invariants
//! - Selecting the hosted backend without URL or key is an error, never a
//!   silent fallback to the embedded store.

use crate::logging::default_log_level;
use crate::repo::{BackendConfig, RemoteConfig};
use crate::view::editor::EditorOptions;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Environment variable names.
pub mod env_vars {
    /// `sqlite` (default) or `remote`.
    pub const BACKEND: &str = "QUICKNOTE_BACKEND";
    /// SQLite file path; `:memory:` selects a throwaway store.
    pub const DB_PATH: &str = "QUICKNOTE_DB_PATH";
    pub const REMOTE_URL: &str = "QUICKNOTE_REMOTE_URL";
    pub const REMOTE_API_KEY: &str = "QUICKNOTE_REMOTE_API_KEY";
    pub const REMOTE_ACCESS_TOKEN: &str = "QUICKNOTE_REMOTE_ACCESS_TOKEN";
    pub const REMOTE_USER_ID: &str = "QUICKNOTE_REMOTE_USER_ID";
    pub const REMOTE_TIMEOUT_SECS: &str = "QUICKNOTE_REMOTE_TIMEOUT_SECS";
    pub const CLOSE_ON_SAVE: &str = "QUICKNOTE_CLOSE_ON_SAVE";
    pub const COPY_RENDERED_HTML: &str = "QUICKNOTE_COPY_RENDERED_HTML";
    pub const LOG_LEVEL: &str = "QUICKNOTE_LOG_LEVEL";
    /// Absolute directory for rolling log files; unset disables file logs.
    pub const LOG_DIR: &str = "QUICKNOTE_LOG_DIR";
}

/// Default values.
pub mod defaults {
    pub const DB_PATH: &str = "quicknote.sqlite3";
    pub const IN_MEMORY_DB: &str = ":memory:";
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, value: String },
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required setting `{var}`"),
            Self::Invalid { var, value } => write!(f, "invalid value `{value}` for `{var}`"),
            Self::Json(err) => write!(f, "invalid configuration document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub editor: EditorOptions,
    #[serde(default = "default_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Sqlite {
                path: Some(PathBuf::from(defaults::DB_PATH)),
            },
            editor: EditorOptions::default(),
            log_level: default_level(),
            log_dir: None,
        }
    }
}

fn default_level() -> String {
    default_log_level().to_string()
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        let backend = get(env_vars::BACKEND).unwrap_or_else(|| "sqlite".to_string());
        config.backend = match backend.to_ascii_lowercase().as_str() {
            "sqlite" => BackendConfig::Sqlite {
                path: match get(env_vars::DB_PATH) {
                    Some(path) if path == defaults::IN_MEMORY_DB => None,
                    Some(path) => Some(PathBuf::from(path)),
                    None => Some(PathBuf::from(defaults::DB_PATH)),
                },
            },
            "remote" => {
                let base_url =
                    get(env_vars::REMOTE_URL).ok_or(ConfigError::Missing(env_vars::REMOTE_URL))?;
                let api_key = get(env_vars::REMOTE_API_KEY)
                    .ok_or(ConfigError::Missing(env_vars::REMOTE_API_KEY))?;
                let mut remote = RemoteConfig::new(base_url, api_key);
                remote.access_token = get(env_vars::REMOTE_ACCESS_TOKEN);
                remote.user_id = get(env_vars::REMOTE_USER_ID);
                if let Some(raw) = get(env_vars::REMOTE_TIMEOUT_SECS) {
                    remote.timeout_secs = raw.parse().map_err(|_| ConfigError::Invalid {
                        var: env_vars::REMOTE_TIMEOUT_SECS,
                        value: raw.clone(),
                    })?;
                }
                BackendConfig::Remote(remote)
            }
            _ => {
                return Err(ConfigError::Invalid {
                    var: env_vars::BACKEND,
                    value: backend,
                })
            }
        };

        if let Some(raw) = get(env_vars::CLOSE_ON_SAVE) {
            config.editor.close_on_save = parse_flag(env_vars::CLOSE_ON_SAVE, &raw)?;
        }
        if let Some(raw) = get(env_vars::COPY_RENDERED_HTML) {
            config.editor.copy_rendered_html = parse_flag(env_vars::COPY_RENDERED_HTML, &raw)?;
        }
        if let Some(level) = get(env_vars::LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = get(env_vars::LOG_DIR).map(PathBuf::from);

        Ok(config)
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(document)?)
    }
}

fn parse_flag(var: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{env_vars, AppConfig, ConfigError};
    use crate::repo::BackendConfig;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_selects_sqlite_file() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Sqlite {
                path: Some(PathBuf::from("quicknote.sqlite3"))
            }
        );
        assert!(!config.editor.close_on_save);
        assert!(config.editor.copy_rendered_html);
    }

    #[test]
    fn memory_path_selects_in_memory_store() {
        let config =
            AppConfig::from_lookup(lookup(&[(env_vars::DB_PATH, ":memory:")])).unwrap();
        assert_eq!(config.backend, BackendConfig::Sqlite { path: None });
    }

    #[test]
    fn remote_backend_requires_url_and_key() {
        let err = AppConfig::from_lookup(lookup(&[(env_vars::BACKEND, "remote")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(env_vars::REMOTE_URL)));

        let config = AppConfig::from_lookup(lookup(&[
            (env_vars::BACKEND, "REMOTE"),
            (env_vars::REMOTE_URL, "https://demo.example.co"),
            (env_vars::REMOTE_API_KEY, "anon"),
            (env_vars::REMOTE_USER_ID, "user-1"),
            (env_vars::CLOSE_ON_SAVE, "yes"),
        ]))
        .unwrap();
        match config.backend {
            BackendConfig::Remote(remote) => {
                assert_eq!(remote.user_id.as_deref(), Some("user-1"));
                assert_eq!(remote.timeout_secs, 30);
            }
            other => panic!("unexpected backend: {other:?}"),
        }
        assert!(config.editor.close_on_save);
    }

    #[test]
    fn bad_flags_and_backends_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(env_vars::CLOSE_ON_SAVE, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        let err = AppConfig::from_lookup(lookup(&[(env_vars::BACKEND, "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == env_vars::BACKEND));
    }

    #[test]
    fn json_document_parses_tagged_backend() {
        let config = AppConfig::from_json_str(
            r#"{
                "backend": {"kind": "remote", "base_url": "https://h", "api_key": "k"},
                "editor": {"close_on_save": true}
            }"#,
        )
        .unwrap();
        assert!(matches!(config.backend, BackendConfig::Remote(_)));
        assert!(config.editor.close_on_save);
        assert!(config.editor.copy_rendered_html);
    }
}
