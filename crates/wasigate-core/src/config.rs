//! Gateway configuration.
//!
//! All knobs of the bridge live here: the module image to run, the entry
//! file passed as its second argument, the docroot exposed to the guest,
//! listen address, resource limits, and the fallback values projected for
//! absent request headers. The header fallbacks are configuration, not
//! hard-coded literals; `localhost` and `wasigate` are only defaults.
//!
//! Configuration can be built in code or loaded from a TOML file; every
//! field has a default so partial files work.
//!
//! # Examples
//!
//! ```
//! use wasigate_core::GatewayConfig;
//!
//! let config = GatewayConfig::default();
//! assert_eq!(config.entry_file, "index.php");
//! assert_eq!(config.default_host, "localhost");
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_module_path() -> PathBuf {
    PathBuf::from("php.wasm")
}

fn default_entry_file() -> String {
    "index.php".to_string()
}

fn default_docroot() -> PathBuf {
    PathBuf::from(".")
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_app_env() -> String {
    "production".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user_agent() -> String {
    "wasigate".to_string()
}

fn default_memory_limit_mb() -> usize {
    256
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_cache_capacity() -> usize {
    16
}

/// Complete configuration for the request bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    /// Path of the compiled module image on disk.
    pub module_path: PathBuf,

    /// Entry file name passed as the module's second argument.
    pub entry_file: String,

    /// Host directory exposed read/write at guest `/`.
    pub docroot: PathBuf,

    /// Socket address the HTTP server binds to.
    pub listen_addr: String,

    /// Value projected as the `APP_ENV` marker variable.
    pub app_env: String,

    /// Fallback for a missing `host` header.
    pub default_host: String,

    /// Fallback for a missing `user-agent` header.
    pub default_user_agent: String,

    /// Guest memory ceiling in megabytes.
    pub memory_limit_mb: usize,

    /// Wall-clock limit per execution, in seconds.
    pub timeout_secs: u64,

    /// Capacity of the compiled-module cache.
    pub cache_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            module_path: default_module_path(),
            entry_file: default_entry_file(),
            docroot: default_docroot(),
            listen_addr: default_listen_addr(),
            app_env: default_app_env(),
            default_host: default_host(),
            default_user_agent: default_user_agent(),
            memory_limit_mb: default_memory_limit_mb(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| Error::Config {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a field holds an unusable value.
    pub fn validate(&self) -> Result<()> {
        if self.entry_file.is_empty() {
            return Err(Error::Config {
                message: "entry_file cannot be empty".to_string(),
            });
        }
        if self.memory_limit_mb == 0 {
            return Err(Error::Config {
                message: "memory_limit_mb must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(Error::Config {
                message: "cache_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
