//! Backend adapters and the normalized task model
//!
//! Each backend has its own endpoint shapes, pagination envelope and status
//! vocabulary. The adapters translate them into [`Task`], [`TaskPage`] and
//! [`TaskStats`] so consumers never branch on response shape.

pub mod admin_log;
pub mod download;
pub mod transcription;

pub use admin_log::{AdminLog, AdminLogClient, CreateAdminLog, UpdateAdminLog};
pub use download::{DownloadAdapter, DownloadQuery, RunningTasks, VideoQuality};
pub use transcription::{
    ModelInfo, ModelQuality, QueueStatus, TranscriptionAdapter, TranscriptionQuery,
};

use crate::core::network::{Backend, FailoverProxy, Payload, Proxied, ProxyError, ProxyRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Transport used by the adapters; the failover proxy in production
#[async_trait::async_trait]
pub trait TaskTransport: Send + Sync {
    async fn call(&self, backend: Backend, request: ProxyRequest) -> Result<Proxied, ProxyError>;
}

#[async_trait::async_trait]
impl TaskTransport for FailoverProxy {
    async fn call(&self, backend: Backend, request: ProxyRequest) -> Result<Proxied, ProxyError> {
        self.proxy_with_fallback(backend, &request).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    /// Rejected before any network call
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("task {id} cannot be cancelled in state {status}")]
    NotCancellable { id: String, status: TaskStatus },
    #[error("unexpected response shape from {backend}: {detail}")]
    UnexpectedShape { backend: Backend, detail: String },
}

/// Shared task status vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    /// Only emitted by the transcription backend
    Queued,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        }
    }

    /// Human readable badge text
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Queued => "Queued",
            TaskStatus::Running => "Running",
            TaskStatus::Success => "Success",
            TaskStatus::Failed => "Failed",
        }
    }

    /// Map a backend status word onto the shared vocabulary
    ///
    /// Synonyms observed across both services are folded in; `None` for words that
    /// match nothing.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "waiting" | "created" => Some(TaskStatus::Pending),
            "queued" | "queue" => Some(TaskStatus::Queued),
            "running" | "downloading" | "processing" | "transcribing" => Some(TaskStatus::Running),
            "success" | "completed" | "complete" | "done" | "finished" => Some(TaskStatus::Success),
            "failed" | "failure" | "error" | "cancelled" | "canceled" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Queued)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality tier, vocabulary depends on the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quality {
    Video(VideoQuality),
    Model(ModelQuality),
    /// Tier the adapter did not recognise, kept verbatim
    Other(String),
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Video(q) => f.write_str(q.as_str()),
            Quality::Model(q) => f.write_str(q.as_str()),
            Quality::Other(q) => f.write_str(q),
        }
    }
}

/// Normalized task, independent of which backend or response shape produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub backend: Backend,
    pub url: String,
    pub quality: Quality,
    pub status: TaskStatus,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Transcription only, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Transcription only, language code or `auto`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_array: Option<String>,
}

impl Task {
    pub fn processing_time(&self) -> String {
        processing_time(self.started_at, self.finished_at)
    }
}

/// One page of normalized tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub data: Vec<Task>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub queued: u64,
    pub running: u64,
    pub success: u64,
    pub failed: u64,
}

/// Accept epoch milliseconds as a number or a numeric string
pub fn normalize_timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .or_else(|| {
                    chrono::DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|dt| dt.timestamp_millis())
                })
        }
        _ => None,
    }
}

/// Duration between two timestamps, or `-` when either is missing
pub fn processing_time(started_at: Option<i64>, finished_at: Option<i64>) -> String {
    match (started_at, finished_at) {
        (Some(start), Some(end)) => format_duration(end.saturating_sub(start).max(0) as u64),
        _ => "-".to_string(),
    }
}

/// `1h 5m`, `3m 20s` or `42s`
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

// Envelope helpers shared by the adapters

/// First present, non-null field among `keys`
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

pub(crate) fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(|value| match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Unsigned count given as a number or numeric string
pub(crate) fn count_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    field(obj, keys).and_then(|value| match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

/// Unwrap `{data: X}` envelopes, returning the inner value when present
pub(crate) fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.get("data").is_some_and(Value::is_object) => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn expect_json(backend: Backend, payload: Payload) -> Result<Value, AdapterError> {
    match payload {
        Payload::Json(value) => Ok(value),
        Payload::Text(text) => Err(AdapterError::UnexpectedShape {
            backend,
            detail: format!("expected JSON, got text ({} bytes)", text.len()),
        }),
    }
}

/// Normalize a paginated listing; accepts both the flat `{data, total, page, pageSize}`
/// envelope and the nested `{data, pagination: {page, pageSize, total, totalPages}}` one
pub(crate) fn normalize_page<F>(
    backend: Backend,
    value: Value,
    default_page_size: u32,
    mut normalize_task: F,
) -> Result<TaskPage, AdapterError>
where
    F: FnMut(&Map<String, Value>) -> Result<Task, AdapterError>,
{
    let obj = match value {
        Value::Object(obj) => obj,
        Value::Array(items) => {
            // Bare array listing: everything is on one page
            let data = items
                .iter()
                .filter_map(Value::as_object)
                .map(&mut normalize_task)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(TaskPage {
                total: data.len() as u64,
                page: 1,
                page_size: default_page_size,
                data,
            });
        }
        other => {
            return Err(AdapterError::UnexpectedShape {
                backend,
                detail: format!("expected paginated object, got {}", json_kind(&other)),
            })
        }
    };

    let items = match obj.get("data") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(AdapterError::UnexpectedShape {
                backend,
                detail: format!("`data` should be an array, got {}", json_kind(other)),
            })
        }
    };

    let data = items
        .iter()
        .filter_map(Value::as_object)
        .map(&mut normalize_task)
        .collect::<Result<Vec<_>, _>>()?;

    let pagination = obj.get("pagination").and_then(Value::as_object);
    let lookup_count = |keys: &[&str]| {
        pagination
            .and_then(|p| count_field(p, keys))
            .or_else(|| count_field(&obj, keys))
    };

    let total = lookup_count(&["total"]).unwrap_or(0);
    let page = lookup_count(&["page"]).filter(|p| *p > 0).unwrap_or(1) as u32;
    let page_size = lookup_count(&["pageSize", "page_size", "limit"])
        .filter(|p| *p > 0)
        .unwrap_or(default_page_size as u64) as u32;

    Ok(TaskPage {
        data,
        total,
        page,
        page_size,
    })
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reject anything that is not an absolute http(s) URL
pub(crate) fn validate_source_url(url: &str) -> Result<(), AdapterError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AdapterError::Validation("url is required".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| AdapterError::Validation(format!("invalid url '{}': {}", trimmed, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AdapterError::Validation(format!(
            "url must use http or https: {}",
            trimmed
        )));
    }
    Ok(())
}
