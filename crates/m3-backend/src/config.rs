#![forbid(unsafe_code)]

//! Backend construction settings.
//!
//! Both backends accept the same [`BackendConfig`]. `Default` produces the
//! values every backend documents as its defaults. With the `config` feature
//! the settings (minus the allocator) can be loaded from TOML or JSON:
//!
//! ```toml
//! handle_capacity = 128
//! clipboard_limit = 65536
//! enable_logging = false
//! inline_tasks = true
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use m3_core::SharedAllocator;

/// Handle table size used when none is configured.
pub const DEFAULT_HANDLE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct BackendConfig {
    /// `None` selects the default allocator.
    #[cfg_attr(feature = "config", serde(skip))]
    pub allocator: Option<SharedAllocator>,
    /// Maximum number of live windows, textures and fonts.
    pub handle_capacity: usize,
    /// Largest clipboard text accepted, in bytes.
    pub clipboard_limit: usize,
    /// Write one log line per backend call.
    pub enable_logging: bool,
    /// Run posted tasks synchronously instead of rejecting them.
    pub inline_tasks: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            allocator: None,
            handle_capacity: DEFAULT_HANDLE_CAPACITY,
            clipboard_limit: usize::MAX,
            enable_logging: true,
            inline_tasks: true,
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn with_allocator(mut self, allocator: SharedAllocator) -> Self {
        self.allocator = Some(allocator);
        self
    }

    #[must_use]
    pub fn with_handle_capacity(mut self, capacity: usize) -> Self {
        self.handle_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_clipboard_limit(mut self, limit: usize) -> Self {
        self.clipboard_limit = limit;
        self
    }

    #[must_use]
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    #[must_use]
    pub fn with_inline_tasks(mut self, inline: bool) -> Self {
        self.inline_tasks = inline;
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Returns a list of problems; empty means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.handle_capacity == 0 {
            errors.push("handle_capacity must be > 0".into());
        }
        if u32::try_from(self.handle_capacity).is_err() {
            errors.push(format!(
                "handle_capacity must fit in u32, got {}",
                self.handle_capacity
            ));
        }
        errors
    }

    /// Check the settings a backend needs before it allocates anything.
    ///
    /// A zero capacity is [`m3_core::Error::InvalidArgument`]; one the handle
    /// table cannot index is [`m3_core::Error::Range`].
    pub fn validate_strict(&self) -> m3_core::Result<()> {
        if self.handle_capacity == 0 {
            return Err(m3_core::Error::InvalidArgument);
        }
        if u32::try_from(self.handle_capacity).is_err() {
            return Err(m3_core::Error::Range);
        }
        Ok(())
    }
}

/// Failure to load a [`BackendConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),
    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),
}
