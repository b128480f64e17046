//! Error types for the wasigate request bridge.
//!
//! Every stage of the bridge pipeline (load → compile → instantiate →
//! run) has its own error variant, so failure reasons stay inspectable by
//! tests and callers without matching on message strings. At the HTTP
//! boundary all variants collapse into the single error-page path.
//!
//! # Examples
//!
//! ```
//! use wasigate_core::{Error, Result};
//!
//! fn check_entry(entry: &str) -> Result<()> {
//!     if entry.is_empty() {
//!         return Err(Error::Config {
//!             message: "entry file name cannot be empty".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = check_entry("").unwrap_err();
//! assert!(err.is_config());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the request bridge.
///
/// All crates in the workspace use this type, providing consistent error
/// handling from module loading through execution.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the module image from disk failed.
    #[error("failed to load module image {path}: {source}")]
    ModuleLoad {
        /// Path of the module image that failed to load
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The module image is not a valid compiled unit.
    #[error("module compilation failed: {message}")]
    Compile {
        /// Description of the compilation failure
        message: String,
    },

    /// Binding the module to its invocation environment failed.
    #[error("module instantiation failed: {message}")]
    Instantiate {
        /// Description of the instantiation failure
        message: String,
    },

    /// The module trapped or exited unsuccessfully during the run.
    #[error("execution failed: {message}")]
    Execution {
        /// Description of the execution failure
        message: String,
    },

    /// The run exceeded its configured wall-clock limit.
    #[error("operation timed out after {duration_secs}s: {operation}")]
    Timeout {
        /// Name of the operation that timed out
        operation: String,
        /// Duration in seconds before timeout occurred
        duration_secs: u64,
    },

    /// An invocation environment violated its invariants.
    #[error("invalid invocation: {message}")]
    Invocation {
        /// Description of the invariant violation
        message: String,
    },

    /// Configuration is invalid or could not be read.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

impl Error {
    /// Returns `true` if this is a module load error.
    #[must_use]
    pub const fn is_module_load(&self) -> bool {
        matches!(self, Self::ModuleLoad { .. })
    }

    /// Returns `true` if this is a compilation error.
    #[must_use]
    pub const fn is_compile(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }

    /// Returns `true` if this is an instantiation error.
    #[must_use]
    pub const fn is_instantiate(&self) -> bool {
        matches!(self, Self::Instantiate { .. })
    }

    /// Returns `true` if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this is an invocation error.
    #[must_use]
    pub const fn is_invocation(&self) -> bool {
        matches!(self, Self::Invocation { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_load_detection() {
        let err = Error::ModuleLoad {
            path: PathBuf::from("/srv/php.wasm"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_module_load());
        assert!(!err.is_execution());
    }

    #[test]
    fn test_compile_detection() {
        let err = Error::Compile {
            message: "bad magic".to_string(),
        };
        assert!(err.is_compile());
        assert!(!err.is_instantiate());
    }

    #[test]
    fn test_timeout_detection() {
        let err = Error::Timeout {
            operation: "module run".to_string(),
            duration_secs: 60,
        };
        assert!(err.is_timeout());
        assert!(!err.is_config());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::ModuleLoad {
            path: PathBuf::from("/srv/php.wasm"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let display = format!("{err}");
        assert!(display.contains("/srv/php.wasm"));

        let err = Error::Execution {
            message: "unreachable instruction".to_string(),
        };
        assert!(format!("{err}").contains("unreachable instruction"));
    }

    #[test]
    fn test_result_alias() {
        fn run() -> Result<i32> {
            Ok(7)
        }
        assert_eq!(run().unwrap(), 7);
    }
}
