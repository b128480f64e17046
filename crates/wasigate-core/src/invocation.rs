//! Per-request invocation environment.
//!
//! An [`InvocationEnv`] is the complete projection handed to one module
//! run: the argument vector, the environment-variable mapping, and the
//! directory mounts exposed to the guest. One is built fresh for every
//! request and discarded afterwards; nothing in it is shared across
//! invocations.
//!
//! Invariants enforced by the builder:
//!
//! - the argument vector is non-empty and its first element identifies
//!   the module image
//! - environment keys are unique (later inserts replace earlier ones)
//!
//! # Examples
//!
//! ```
//! use wasigate_core::ModuleId;
//! use wasigate_core::invocation::InvocationEnv;
//!
//! let env = InvocationEnv::builder(ModuleId::new("php.wasm"))
//!     .arg("index.php")
//!     .env("REQUEST_METHOD", "GET")
//!     .mount_rw("/srv/www", "/")
//!     .build();
//!
//! assert_eq!(env.args()[0], "php.wasm");
//! assert_eq!(env.get_env("REQUEST_METHOD"), Some("GET"));
//! ```

use crate::ModuleId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A host directory exposed to the guest filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirMount {
    /// Host directory to expose
    pub host: PathBuf,
    /// Guest path the directory appears under
    pub guest: String,
    /// Whether the guest may write through this mount
    pub writable: bool,
}

/// The argument vector, environment mapping, and filesystem exposure for
/// one module execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationEnv {
    args: Vec<String>,
    env: BTreeMap<String, String>,
    mounts: Vec<DirMount>,
}

impl InvocationEnv {
    /// Creates a builder rooted at the given module identifier.
    ///
    /// The identifier becomes the first argument, so the resulting
    /// argument vector is never empty.
    #[must_use]
    pub fn builder(module: ModuleId) -> InvocationEnvBuilder {
        InvocationEnvBuilder {
            args: vec![module.into_inner()],
            env: BTreeMap::new(),
            mounts: Vec::new(),
        }
    }

    /// Returns the argument vector.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the environment variables in key order.
    pub fn env_vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Looks up a single environment variable.
    #[must_use]
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Returns the directory mounts.
    #[must_use]
    pub fn mounts(&self) -> &[DirMount] {
        &self.mounts
    }
}

/// Builder for [`InvocationEnv`].
#[derive(Debug)]
pub struct InvocationEnvBuilder {
    args: Vec<String>,
    env: BTreeMap<String, String>,
    mounts: Vec<DirMount>,
}

impl InvocationEnvBuilder {
    /// Appends an argument after the module identifier.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable. Setting a key twice keeps the last
    /// value, preserving key uniqueness.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Exposes a host directory to the guest read-only.
    #[must_use]
    pub fn mount_ro(mut self, host: impl AsRef<Path>, guest: impl Into<String>) -> Self {
        self.mounts.push(DirMount {
            host: host.as_ref().to_path_buf(),
            guest: guest.into(),
            writable: false,
        });
        self
    }

    /// Exposes a host directory to the guest read/write.
    #[must_use]
    pub fn mount_rw(mut self, host: impl AsRef<Path>, guest: impl Into<String>) -> Self {
        self.mounts.push(DirMount {
            host: host.as_ref().to_path_buf(),
            guest: guest.into(),
            writable: true,
        });
        self
    }

    /// Builds the invocation environment.
    #[must_use]
    pub fn build(self) -> InvocationEnv {
        InvocationEnv {
            args: self.args,
            env: self.env,
            mounts: self.mounts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_starts_with_module() {
        let env = InvocationEnv::builder(ModuleId::new("php.wasm"))
            .arg("index.php")
            .build();
        assert_eq!(env.args(), ["php.wasm", "index.php"]);
    }

    #[test]
    fn test_argv_never_empty() {
        let env = InvocationEnv::builder(ModuleId::new("php.wasm")).build();
        assert_eq!(env.args().len(), 1);
    }

    #[test]
    fn test_env_keys_unique() {
        let env = InvocationEnv::builder(ModuleId::new("m"))
            .env("QUERY_STRING", "a=1")
            .env("QUERY_STRING", "b=2")
            .build();
        assert_eq!(env.env_vars().count(), 1);
        assert_eq!(env.get_env("QUERY_STRING"), Some("b=2"));
    }

    #[test]
    fn test_env_lookup_missing() {
        let env = InvocationEnv::builder(ModuleId::new("m")).build();
        assert_eq!(env.get_env("HTTP_HOST"), None);
    }

    #[test]
    fn test_mounts() {
        let env = InvocationEnv::builder(ModuleId::new("m"))
            .mount_rw("/srv/www", "/")
            .mount_ro("/etc/app", "/etc/app")
            .build();
        assert_eq!(env.mounts().len(), 2);
        assert!(env.mounts()[0].writable);
        assert_eq!(env.mounts()[0].guest, "/");
        assert!(!env.mounts()[1].writable);
    }
}
