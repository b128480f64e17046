//! HTTP entry point for the wasigate request bridge.
//!
//! Every inbound request, regardless of method or path, is handled by a
//! single fallback route: the request is projected into an invocation
//! environment, the configured module image is executed once, and the
//! captured stdout becomes the response body. Any failure along the way
//! produces the fixed HTML error page with status 500.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;
use wasigate_core::GatewayConfig;
use wasigate_runtime::{Executor, ModuleLoader, RuntimeLimits};

mod bridge;
mod error_page;
mod projection;

pub use bridge::handle;
pub use projection::project;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Module executor (engine + compiled-module cache).
    pub executor: Arc<Executor>,
    /// Disk loader for the module image.
    pub loader: Arc<ModuleLoader>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Builds the state from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the Wasmtime
    /// engine cannot be created.
    pub fn from_config(config: GatewayConfig) -> wasigate_core::Result<Self> {
        config.validate()?;

        let limits = RuntimeLimits::builder()
            .memory_limit_mb(config.memory_limit_mb)
            .execution_timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build();
        let executor = Executor::new(limits, config.cache_capacity)?;
        let loader = ModuleLoader::new(&config.module_path);

        Ok(Self {
            config: Arc::new(config),
            executor: Arc::new(executor),
            loader: Arc::new(loader),
        })
    }
}

/// Builds the router: one fallback route accepting any method and path.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(bridge::handle)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves the bridge until shutdown.
///
/// # Errors
///
/// Returns an error if the state cannot be built, the address cannot be
/// bound, or the server fails while running.
pub async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = config.listen_addr.clone();
    let state = AppState::from_config(config)?;
    let app = router(state);

    info!(%addr, "wasigate listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
