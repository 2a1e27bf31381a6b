//! Client configuration.
//!
//! The backend base URL is the only piece of state persisted between runs.
//! It is resolved once at startup and passed explicitly to the API client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base URL used when neither the config file nor the build provides one.
pub const FALLBACK_API_BASE: &str = "http://localhost:8000";

/// Build-time default backend, set through `CARDSCAN_API_BASE` when compiling.
pub const BUILD_API_BASE: Option<&str> = option_env!("CARDSCAN_API_BASE");

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Stored backend base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer key sent with extraction uploads.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Interactive presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UiConfig {
    /// Search input must be stable this long before it filters the list.
    #[serde(default = "default_debounce_ms")]
    pub search_debounce_ms: u64,

    /// How long a toast message stays visible.
    #[serde(default = "default_toast_secs")]
    pub toast_secs: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_debounce_ms(),
            toast_secs: default_toast_secs(),
        }
    }
}

const fn default_debounce_ms() -> u64 {
    200
}

const fn default_toast_secs() -> u64 {
    3
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cardscan")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Resolve the backend base URL.
    ///
    /// Precedence: stored value, build-time default, local fallback.
    #[must_use]
    pub fn api_base(&self) -> String {
        let raw = self
            .backend
            .base_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(BUILD_API_BASE.filter(|s| !s.trim().is_empty()))
            .unwrap_or(FALLBACK_API_BASE);
        normalize_base(raw)
    }

    /// Store a new backend base URL in normalized form.
    pub fn set_api_base(&mut self, base: &str) {
        self.backend.base_url = Some(normalize_base(base));
    }

    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.ui.search_debounce_ms)
    }

    #[must_use]
    pub const fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.ui.toast_secs)
    }
}

/// Trim whitespace and trailing slashes from a base URL.
#[must_use]
pub fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}
