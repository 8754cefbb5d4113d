//! Transcription service adapter
//!
//! All endpoints live under `/tts`. Listing may come back with a flat or a nested
//! pagination envelope; stats report no success count, so it is derived as
//! `max(0, totalTasks - runningTasks - failedTasks)`.

use super::download::validate_task_id;
use super::{
    count_field, expect_json, field, json_kind, normalize_page, normalize_timestamp,
    string_field, unwrap_data, validate_source_url, AdapterError, Quality, Task, TaskPage,
    TaskStats, TaskStatus, TaskTransport,
};
use crate::core::debug_logger::get_debug_logger;
use crate::core::network::{Backend, Payload, ProxyRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const BACKEND: Backend = Backend::Transcription;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Language used when a task does not specify one
pub const DEFAULT_LANGUAGE: &str = "zh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelQuality {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelQuality::Tiny => "tiny",
            ModelQuality::Base => "base",
            ModelQuality::Small => "small",
            ModelQuality::Medium => "medium",
            ModelQuality::Large => "large",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tiny" => Some(ModelQuality::Tiny),
            "base" => Some(ModelQuality::Base),
            "small" => Some(ModelQuality::Small),
            "medium" => Some(ModelQuality::Medium),
            "large" => Some(ModelQuality::Large),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionQuery {
    pub page: u32,
    pub page_size: u32,
    pub status: Option<TaskStatus>,
    pub quality: Option<ModelQuality>,
    pub location: Option<String>,
}

impl Default for TranscriptionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            status: None,
            quality: None,
            location: None,
        }
    }
}

impl TranscriptionQuery {
    pub fn to_request(&self) -> ProxyRequest {
        let page = self.page.max(1).to_string();
        let page_size = self.page_size.max(1).to_string();
        ProxyRequest::get("/tts/tasks").with_query_pairs([
            ("page", page.as_str()),
            ("pageSize", page_size.as_str()),
            ("status", self.status.map(|s| s.as_str()).unwrap_or("")),
            ("quality", self.quality.map(|q| q.as_str()).unwrap_or("")),
            ("location", self.location.as_deref().unwrap_or("")),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: u64,
    pub running_tasks: u64,
    pub max_concurrent: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub quality: Quality,
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct TranscriptionAdapter {
    transport: Arc<dyn TaskTransport>,
}

impl TranscriptionAdapter {
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self { transport }
    }

    async fn call(&self, request: ProxyRequest) -> Result<Payload, AdapterError> {
        Ok(self.transport.call(BACKEND, request).await?.data)
    }

    async fn call_json(&self, request: ProxyRequest) -> Result<Value, AdapterError> {
        expect_json(BACKEND, self.call(request).await?)
    }

    pub async fn list_tasks(&self, query: &TranscriptionQuery) -> Result<TaskPage, AdapterError> {
        let value = self.call_json(query.to_request()).await?;
        normalize_page(BACKEND, value, query.page_size.max(1), normalize_task)
    }

    /// Accepts both a bare task and `{data: task}`
    pub async fn get_task(&self, id: &str) -> Result<Task, AdapterError> {
        validate_task_id(id)?;
        let value = self.call_json(ProxyRequest::get(format!("/tts/{}", id))).await?;
        task_from_value(unwrap_data(value))
    }

    pub async fn create_task(
        &self,
        url: &str,
        quality: ModelQuality,
        language: &str,
    ) -> Result<Task, AdapterError> {
        validate_source_url(url)?;
        let language = match language.trim() {
            "" => DEFAULT_LANGUAGE,
            language => language,
        };

        let value = self
            .call_json(ProxyRequest::post(
                "/tts/task",
                json!({
                    "url": url.trim(),
                    "quality": quality.as_str(),
                    "languageArray": language,
                }),
            ))
            .await?;
        task_from_value(unwrap_data(value))
    }

    /// Re-submit a task with its original url, quality and language
    pub async fn retry_task(&self, task: &Task) -> Result<Task, AdapterError> {
        let quality = match &task.quality {
            Quality::Model(quality) => *quality,
            other => ModelQuality::parse(&other.to_string()).ok_or_else(|| {
                AdapterError::Validation(format!(
                    "task {} has no transcription quality ({})",
                    task.id, other
                ))
            })?,
        };
        let language = task.language_array.as_deref().unwrap_or(DEFAULT_LANGUAGE);
        self.create_task(&task.url, quality, language).await
    }

    /// Cancel a task; only `pending` and `queued` tasks are cancellable
    pub async fn cancel_task(&self, id: &str) -> Result<(), AdapterError> {
        let task = self.get_task(id).await?;
        if !task.status.is_cancellable() {
            return Err(AdapterError::NotCancellable {
                id: task.id,
                status: task.status,
            });
        }

        self.call(ProxyRequest::delete("/tts/cancel").with_query_pairs([("id", id)]))
            .await?;
        Ok(())
    }

    pub async fn queue_status(&self) -> Result<QueueStatus, AdapterError> {
        let value = unwrap_data(self.call_json(ProxyRequest::get("/tts/queue/status")).await?);
        let obj = as_object(&value, "queue status")?;

        Ok(QueueStatus {
            queue_length: count_field(obj, &["queueLength", "queue_length"]).unwrap_or(0),
            running_tasks: count_field(obj, &["runningTasks", "running_tasks"]).unwrap_or(0),
            max_concurrent: count_field(obj, &["maxConcurrent", "max_concurrent"]).unwrap_or(0),
        })
    }

    pub async fn stats(&self) -> Result<TaskStats, AdapterError> {
        let value = unwrap_data(self.call_json(ProxyRequest::get("/tts/stats")).await?);
        let obj = as_object(&value, "stats")?;
        Ok(derive_stats(
            count_field(obj, &["totalTasks", "total"]).unwrap_or(0),
            count_field(obj, &["runningTasks", "running"]).unwrap_or(0),
            count_field(obj, &["failedTasks", "failed"]).unwrap_or(0),
        ))
    }

    pub async fn models(&self) -> Result<Vec<ModelInfo>, AdapterError> {
        let value = self.call_json(ProxyRequest::get("/tts/models")).await?;
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        Ok(items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| {
                let name = string_field(obj, &["name"])?;
                let quality = string_field(obj, &["quality"]).unwrap_or_else(|| name.clone());
                Some(ModelInfo {
                    quality: ModelQuality::parse(&quality)
                        .map(Quality::Model)
                        .unwrap_or(Quality::Other(quality)),
                    size: string_field(obj, &["size"]).unwrap_or_default(),
                    description: string_field(obj, &["description"]),
                    name,
                })
            })
            .collect())
    }

    /// Plain text extracted from a subtitle file
    pub async fn srt_to_txt(&self, file: &str) -> Result<String, AdapterError> {
        if file.trim().is_empty() {
            return Err(AdapterError::Validation("file is required".to_string()));
        }

        match self
            .call(ProxyRequest::get("/tts/srt-to-txt").with_query_pairs([("file", file.trim())]))
            .await?
        {
            Payload::Text(text) => Ok(text),
            Payload::Json(Value::String(text)) => Ok(text),
            Payload::Json(Value::Object(obj)) => string_field(&obj, &["text", "data", "content"])
                .ok_or_else(|| AdapterError::UnexpectedShape {
                    backend: BACKEND,
                    detail: "srt-to-txt response has no text".to_string(),
                }),
            Payload::Json(other) => Err(AdapterError::UnexpectedShape {
                backend: BACKEND,
                detail: format!("srt-to-txt returned {}", json_kind(&other)),
            }),
        }
    }

    /// Ask the backend to purge tasks and files past its retention window
    pub async fn cleanup(&self) -> Result<Value, AdapterError> {
        let payload = self
            .call(ProxyRequest::post("/tts/cleanup", json!({})))
            .await?;
        Ok(payload.into_json())
    }
}

/// Success is not reported by the backend; derive it and clamp at zero
pub fn derive_stats(total: u64, running: u64, failed: u64) -> TaskStats {
    TaskStats {
        total,
        pending: 0,
        queued: 0,
        running,
        success: total.saturating_sub(running).saturating_sub(failed),
        failed,
    }
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, AdapterError> {
    value.as_object().ok_or_else(|| AdapterError::UnexpectedShape {
        backend: BACKEND,
        detail: format!("{} should be an object, got {}", what, json_kind(value)),
    })
}

fn task_from_value(value: Value) -> Result<Task, AdapterError> {
    match value {
        Value::Object(obj) => normalize_task(&obj),
        other => Err(AdapterError::UnexpectedShape {
            backend: BACKEND,
            detail: format!("task should be an object, got {}", json_kind(&other)),
        }),
    }
}

/// Normalize one transcription task object (camelCase or snake_case timestamps)
pub fn normalize_task(obj: &Map<String, Value>) -> Result<Task, AdapterError> {
    let id = string_field(obj, &["id", "taskId", "_id"]).ok_or_else(|| {
        AdapterError::UnexpectedShape {
            backend: BACKEND,
            detail: "task without id".to_string(),
        }
    })?;

    let quality = match string_field(obj, &["quality"]) {
        Some(raw) => ModelQuality::parse(&raw)
            .map(Quality::Model)
            .unwrap_or(Quality::Other(raw)),
        None => Quality::Model(ModelQuality::Medium),
    };

    let status = match string_field(obj, &["status"]).as_deref().and_then(TaskStatus::parse) {
        Some(status) => status,
        None => {
            get_debug_logger().adapter_normalize(
                &BACKEND.to_string(),
                &format!(
                    "task {} has unknown status {:?}, treating as pending",
                    id,
                    obj.get("status")
                ),
            );
            TaskStatus::Pending
        }
    };

    let progress = count_field(obj, &["progress"]).map(|p| p.min(100) as u8);

    Ok(Task {
        url: string_field(obj, &["url"]).unwrap_or_default(),
        quality,
        status,
        created_at: normalize_timestamp(field(obj, &["createdAt", "created_at"])).unwrap_or(0),
        started_at: normalize_timestamp(field(obj, &["startedAt", "started_at"])),
        finished_at: normalize_timestamp(field(obj, &["finishedAt", "finished_at"])),
        location: string_field(obj, &["location"]),
        output: string_field(obj, &["output"]),
        output_name: string_field(obj, &["outputName", "output_name"]),
        full_path: string_field(obj, &["fullPath", "full_path"]),
        error: string_field(obj, &["error"]),
        progress,
        language_array: string_field(obj, &["languageArray", "language_array", "language"]),
        backend: BACKEND,
        id,
    })
}
