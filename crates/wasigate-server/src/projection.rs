//! Request-to-environment projection.
//!
//! Maps the consumed parts of an HTTP request onto the CGI-style
//! environment the guest expects:
//!
//! | key               | source                                  |
//! |-------------------|------------------------------------------|
//! | `APP_ENV`         | configured marker literal                |
//! | `REQUEST_METHOD`  | request method                           |
//! | `REQUEST_URI`     | request path + query                     |
//! | `HTTP_HOST`       | `host` header, configurable fallback     |
//! | `HTTP_USER_AGENT` | `user-agent` header, configurable fallback |
//! | `QUERY_STRING`    | URL substring after `?`, default empty   |
//!
//! The argument vector is always `[module file name, entry file name]`,
//! and exactly one mount exposes the docroot read/write at guest `/`.

use axum::http::{HeaderMap, Method, Uri, header};
use wasigate_core::invocation::InvocationEnv;
use wasigate_core::{GatewayConfig, ModuleId};

/// Builds the invocation environment for one request.
#[must_use]
pub fn project(
    config: &GatewayConfig,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> InvocationEnv {
    let module_name = config
        .module_path
        .file_name()
        .map_or_else(|| "module.wasm".to_string(), |n| n.to_string_lossy().into_owned());

    let request_uri = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

    let host = header_or(headers, header::HOST, &config.default_host);
    let user_agent = header_or(headers, header::USER_AGENT, &config.default_user_agent);

    InvocationEnv::builder(ModuleId::new(module_name))
        .arg(&config.entry_file)
        .env("APP_ENV", &config.app_env)
        .env("REQUEST_METHOD", method.as_str())
        .env("REQUEST_URI", request_uri)
        .env("HTTP_HOST", host)
        .env("HTTP_USER_AGENT", user_agent)
        .env("QUERY_STRING", uri.query().unwrap_or(""))
        .mount_rw(&config.docroot, "/")
        .build()
}

/// Reads a header as UTF-8, falling back to the configured default when
/// the header is absent or not valid text.
fn header_or<'a>(headers: &'a HeaderMap, name: header::HeaderName, fallback: &'a str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(fallback)
}
