use super::{AppError, AppState};
use crate::core::debug_logger::get_debug_logger;
use crate::core::network::{get_local_timestamp, Backend, HttpMethod, Payload, ProxyRequest};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderName, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

pub const TRANSCRIPTION_PREFIX: &str = "/api/tv";
pub const DOWNLOAD_PREFIX: &str = "/api/dv";

/// Header naming the network that served a proxied request
pub const SERVED_BY_HEADER: HeaderName = HeaderName::from_static("x-served-by-network");

/// Reachability of every backend/network combination
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.proxy.health_report().await)
}

/// Probe verdicts for both backends, refreshing stale ones first
pub async fn network(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = state.proxy.probe();
    tokio::join!(
        probe.check_public_network(Backend::Download),
        probe.check_public_network(Backend::Transcription),
    );

    Json(json!({
        "status": "ok",
        "timestamp": get_local_timestamp(),
        "network": {
            "download": probe.status(Backend::Download),
            "transcription": probe.status(Backend::Transcription),
        },
    }))
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard.snapshot())
}

pub async fn logs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.logs.clone())
}

pub async fn proxy_transcription(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response, AppError> {
    let path = upstream_path(&uri, TRANSCRIPTION_PREFIX)?;
    forward(&state, Backend::Transcription, method, path, uri.query(), body).await
}

pub async fn proxy_download(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response, AppError> {
    let path = upstream_path(&uri, DOWNLOAD_PREFIX)?;
    forward(&state, Backend::Download, method, path, uri.query(), body).await
}

/// Backend-relative path, still percent-encoded as the client sent it
fn upstream_path<'a>(uri: &'a Uri, prefix: &str) -> Result<&'a str, AppError> {
    uri.path()
        .strip_prefix(prefix)
        .filter(|rest| rest.starts_with('/'))
        .ok_or_else(|| AppError::BadRequest(format!("path must start with {}/", prefix)))
}

async fn forward(
    state: &AppState,
    backend: Backend,
    method: Method,
    path: &str,
    query: Option<&str>,
    body: Bytes,
) -> Result<Response, AppError> {
    let method = HttpMethod::parse(method.as_str())
        .ok_or_else(|| AppError::MethodNotAllowed(format!("method {} is not proxied", method)))?;

    let mut request = ProxyRequest::new(method, path).with_raw_query(query);
    if method.allows_body() && !body.is_empty() {
        // Non-JSON bodies are dropped rather than rejected
        if let Ok(value) = serde_json::from_slice::<Value>(&body) {
            request = request.with_body(value);
        }
    }

    let proxied = state
        .proxy
        .proxy_with_fallback(backend, &request)
        .await
        .map_err(|e| {
            let detail = format!("{} {}: {}", backend, request.path, e);
            get_debug_logger().error("server", "proxy_route_failed", &detail);
            AppError::from(e)
        })?;

    let served_by = [(SERVED_BY_HEADER, proxied.network.to_string())];
    Ok(match proxied.data {
        Payload::Json(value) => (served_by, Json(value)).into_response(),
        Payload::Text(text) => (
            served_by,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string())],
            text,
        )
            .into_response(),
    })
}
