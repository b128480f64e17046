//! The request bridge handler.
//!
//! One linear sequence per request: read image → build invocation →
//! run → wrap captured stdout as the response. A response is always
//! returned; every failure maps to the fixed 500 page. The content type
//! is `text/html; charset=utf-8` on both paths.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::Response;
use wasigate_core::Result;
use wasigate_core::output::CapturedOutput;

use crate::{AppState, error_page, projection};

const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
const POWERED_BY: &str = "wasigate";
const WASM_RUNTIME: &str = "wasmtime";

/// Handles one request end to end.
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    match run(&state, &method, &uri, &headers).await {
        Ok(output) => success_response(output),
        Err(err) => {
            tracing::error!(error = %err, %method, %uri, "bridge request failed");
            error_response(&err.to_string())
        }
    }
}

/// The fallible part of the bridge: load, project, execute.
async fn run(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<CapturedOutput> {
    let image = state.loader.read().await?;
    let invocation = projection::project(&state.config, method, uri, headers);

    tracing::debug!(%method, %uri, "invoking module");
    let output = state.executor.run(&image, &invocation).await?;

    if !output.stderr().is_empty() {
        tracing::warn!(stderr = %output.stderr_lossy(), "guest wrote to stderr");
    }
    Ok(output)
}

fn success_response(output: CapturedOutput) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, CONTENT_TYPE_HTML)
        .header("x-powered-by", POWERED_BY)
        .header("x-wasm-runtime", WASM_RUNTIME)
        .body(Body::from(output.into_body()))
        .expect("static response headers are valid")
}

fn error_response(message: &str) -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, CONTENT_TYPE_HTML)
        .body(Body::from(error_page::render(message)))
        .expect("static response headers are valid")
}
