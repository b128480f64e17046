//! Strong domain types for the request bridge.
//!
//! Newtypes keep module identifiers and resource limits from being mixed
//! up with plain strings and integers.
//!
//! # Examples
//!
//! ```
//! use wasigate_core::{MemoryLimit, ModuleId};
//!
//! let id = ModuleId::new("php.wasm");
//! let limit = MemoryLimit::from_mb(256).unwrap();
//! assert_eq!(limit.bytes(), 256 * 1024 * 1024);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Module image identifier (newtype over String).
///
/// Identifies the opaque module image being invoked; used as the first
/// element of the argument vector, the way a program name appears in
/// `argv[0]`.
///
/// # Examples
///
/// ```
/// use wasigate_core::ModuleId;
///
/// let id = ModuleId::new("php.wasm");
/// assert_eq!(id.as_str(), "php.wasm");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    /// Creates a new module identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the module ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ModuleId` and returns the inner `String`.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModuleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Memory limit in bytes (newtype over usize).
///
/// Validated at construction so the runtime never sees a zero or
/// unreasonably small ceiling.
///
/// # Examples
///
/// ```
/// use wasigate_core::MemoryLimit;
///
/// let limit = MemoryLimit::from_mb(128).unwrap();
/// assert_eq!(limit.megabytes(), 128);
/// assert!(MemoryLimit::from_mb(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryLimit(usize);

impl MemoryLimit {
    /// Creates a memory limit from megabytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `mb` is zero.
    pub fn from_mb(mb: usize) -> Result<Self> {
        if mb == 0 {
            return Err(Error::Config {
                message: "memory limit must be at least 1 MB".to_string(),
            });
        }
        Ok(Self(mb * 1024 * 1024))
    }

    /// Returns the limit in bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> usize {
        self.0
    }

    /// Returns the limit in whole megabytes.
    #[inline]
    #[must_use]
    pub const fn megabytes(&self) -> usize {
        self.0 / (1024 * 1024)
    }
}
