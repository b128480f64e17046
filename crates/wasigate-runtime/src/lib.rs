//! WASI execution runtime for the wasigate request bridge.
//!
//! Runs an opaque, externally supplied WASI command module once per
//! request: argv/env from the invocation environment, stdout captured in
//! memory, a memory ceiling and wall-clock timeout enforced, and the
//! compiled module memoized across requests.

pub mod cache;
pub mod executor;
pub mod limits;
pub mod loader;

pub use executor::Executor;
pub use limits::RuntimeLimits;
pub use loader::ModuleLoader;
