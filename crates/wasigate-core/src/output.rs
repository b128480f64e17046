//! Captured output from one module execution.
//!
//! The bridge treats the guest's stdout as the response body verbatim.
//! Stderr is carried alongside for logging, never for the response.

use std::time::Duration;

/// Fallback body used when a run produces no output at all.
pub const NO_OUTPUT_FALLBACK: &str = "No output";

/// The byte streams and exit status captured from a single run.
///
/// Created fresh per invocation, never cached or persisted.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wasigate_core::output::CapturedOutput;
///
/// let out = CapturedOutput::new(b"<h1>hi</h1>".to_vec(), Vec::new(), 0, Duration::ZERO);
/// assert_eq!(out.stdout_lossy(), "<h1>hi</h1>");
/// assert!(out.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: i32,
    elapsed: Duration,
}

impl CapturedOutput {
    /// Creates a captured output record.
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: i32, elapsed: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            elapsed,
        }
    }

    /// Returns the raw stdout bytes.
    #[must_use]
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Returns the raw stderr bytes.
    #[must_use]
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    /// Returns stdout decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Returns stderr decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Consumes the record and returns the stdout bytes, or the fixed
    /// [`NO_OUTPUT_FALLBACK`] body when the run emitted nothing.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        if self.stdout.is_empty() {
            NO_OUTPUT_FALLBACK.as_bytes().to_vec()
        } else {
            self.stdout
        }
    }

    /// Returns the guest exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns `true` if the guest exited with code zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the wall-clock duration of the run.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
