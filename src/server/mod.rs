//! HTTP surface consumed by the dashboard UI

pub mod handlers;

use crate::config::LogServer;
use crate::core::network::{FailoverProxy, ProxyError};
use crate::core::poller::DashboardState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use std::sync::Arc;

/// Shared state behind every route
pub struct AppState {
    pub proxy: Arc<FailoverProxy>,
    pub dashboard: Arc<DashboardState>,
    pub logs: Vec<LogServer>,
}

/// Route error, always rendered as `{"error": message}`
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    MethodNotAllowed(String),
    Internal(String),
}

impl From<ProxyError> for AppError {
    fn from(error: ProxyError) -> Self {
        match error {
            ProxyError::InvalidRequest(_) => AppError::BadRequest(error.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/network", get(handlers::network))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/logs", get(handlers::logs))
        .route("/api/tv/*path", any(handlers::proxy_transcription))
        .route("/api/dv/*path", any(handlers::proxy_download))
        .with_state(state)
}
