//! Resource limits for module execution.
//!
//! Each run gets a guest memory ceiling, a wall-clock timeout, and a cap
//! on captured output. The bridge executes one trusted, operator-supplied
//! image, so there are no per-caller security profiles; the limits exist
//! to keep a misbehaving guest from taking the host down with it.
//!
//! # Examples
//!
//! ```
//! use wasigate_runtime::RuntimeLimits;
//!
//! let limits = RuntimeLimits::default();
//! assert_eq!(limits.memory_limit().megabytes(), 256);
//! ```

use std::time::Duration;
use wasigate_core::MemoryLimit;
use wasmtime::ResourceLimiter;

/// Limits applied to every module execution.
#[derive(Debug, Clone)]
pub struct RuntimeLimits {
    /// Maximum guest linear memory
    memory_limit: MemoryLimit,

    /// Maximum wall-clock time per run
    execution_timeout: Duration,

    /// Maximum bytes of captured stdout/stderr per run
    max_output_bytes: usize,
}

impl RuntimeLimits {
    /// Default memory limit: 256MB
    pub const DEFAULT_MEMORY_LIMIT_MB: usize = 256;

    /// Default execution timeout: 60 seconds
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Default captured-output cap: 16MB
    pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

    /// Creates a new limits builder.
    #[inline]
    #[must_use]
    pub fn builder() -> RuntimeLimitsBuilder {
        RuntimeLimitsBuilder::default()
    }

    /// Returns the guest memory ceiling.
    #[inline]
    #[must_use]
    pub const fn memory_limit(&self) -> MemoryLimit {
        self.memory_limit
    }

    /// Returns the wall-clock limit per run.
    #[inline]
    #[must_use]
    pub const fn execution_timeout(&self) -> Duration {
        self.execution_timeout
    }

    /// Returns the captured-output cap in bytes.
    #[inline]
    #[must_use]
    pub const fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`RuntimeLimits`].
#[derive(Debug, Default)]
pub struct RuntimeLimitsBuilder {
    memory_limit_mb: Option<usize>,
    execution_timeout: Option<Duration>,
    max_output_bytes: Option<usize>,
}

impl RuntimeLimitsBuilder {
    /// Sets the memory limit in megabytes.
    #[must_use]
    pub fn memory_limit_mb(mut self, mb: usize) -> Self {
        self.memory_limit_mb = Some(mb);
        self
    }

    /// Sets the wall-clock limit per run.
    #[must_use]
    pub fn execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    /// Sets the captured-output cap in bytes.
    #[must_use]
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = Some(bytes);
        self
    }

    /// Builds the limits.
    ///
    /// # Panics
    ///
    /// Panics if the memory limit is zero.
    #[must_use]
    pub fn build(self) -> RuntimeLimits {
        let memory_limit_mb = self
            .memory_limit_mb
            .unwrap_or(RuntimeLimits::DEFAULT_MEMORY_LIMIT_MB);

        RuntimeLimits {
            memory_limit: MemoryLimit::from_mb(memory_limit_mb)
                .expect("memory limit must be valid"),
            execution_timeout: self
                .execution_timeout
                .unwrap_or_else(|| Duration::from_secs(RuntimeLimits::DEFAULT_TIMEOUT_SECS)),
            max_output_bytes: self
                .max_output_bytes
                .unwrap_or(RuntimeLimits::DEFAULT_MAX_OUTPUT_BYTES),
        }
    }
}

/// Memory limiter installed into each store.
#[derive(Debug)]
pub(crate) struct GuestMemoryLimiter {
    pub(crate) max_memory_bytes: usize,
}

impl ResourceLimiter for GuestMemoryLimiter {
    fn memory_growing(
        &mut self,
        current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> std::result::Result<bool, anyhow::Error> {
        if desired > self.max_memory_bytes {
            tracing::warn!(
                "memory limit exceeded: {} > {}",
                desired,
                self.max_memory_bytes
            );
            Ok(false)
        } else {
            tracing::trace!("memory growing: {} -> {} bytes", current, desired);
            Ok(true)
        }
    }

    fn table_growing(
        &mut self,
        _current: usize,
        _desired: usize,
        _maximum: Option<usize>,
    ) -> std::result::Result<bool, anyhow::Error> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = RuntimeLimits::default();
        assert_eq!(limits.memory_limit().bytes(), 256 * 1024 * 1024);
        assert_eq!(limits.execution_timeout(), Duration::from_secs(60));
        assert_eq!(limits.max_output_bytes(), 16 * 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let limits = RuntimeLimits::builder()
            .memory_limit_mb(64)
            .execution_timeout(Duration::from_secs(5))
            .max_output_bytes(1024)
            .build();

        assert_eq!(limits.memory_limit().megabytes(), 64);
        assert_eq!(limits.execution_timeout(), Duration::from_secs(5));
        assert_eq!(limits.max_output_bytes(), 1024);
    }

    #[test]
    fn test_limiter_denies_growth_past_ceiling() {
        let mut limiter = GuestMemoryLimiter {
            max_memory_bytes: 1024,
        };
        assert!(limiter.memory_growing(0, 512, None).unwrap());
        assert!(!limiter.memory_growing(512, 2048, None).unwrap());
    }
}
