//! Core types, errors, and configuration for the wasigate request bridge.
//!
//! This crate provides the foundational types shared by the runtime and
//! HTTP server crates:
//!
//! - Strong domain types (`ModuleId`, `MemoryLimit`)
//! - The typed error hierarchy (one variant per bridge stage)
//! - The per-request invocation environment and captured output
//! - Gateway configuration with TOML loading

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod error;
mod types;

pub mod invocation;
pub mod output;
pub mod stats;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use types::{MemoryLimit, ModuleId};
