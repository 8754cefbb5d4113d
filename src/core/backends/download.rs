//! Download service adapter
//!
//! Listing is `POST /tasks/query {filters, page, limit}`. Stats are derived from one
//! listing query per status, issued concurrently, reading each page's `total`.

use super::{
    count_field, expect_json, field, normalize_page, normalize_timestamp, string_field,
    unwrap_data, validate_source_url, AdapterError, Quality, Task, TaskPage, TaskStats,
    TaskStatus, TaskTransport,
};
use crate::core::debug_logger::get_debug_logger;
use crate::core::network::{Backend, ProxyRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const BACKEND: Backend = Backend::Download;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Statuses the download service reports; it has no queue
const STATUSES: [TaskStatus; 4] = [
    TaskStatus::Pending,
    TaskStatus::Running,
    TaskStatus::Success,
    TaskStatus::Failed,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoQuality {
    #[default]
    VideoBest,
    AudioBest,
    VideoWorst,
    AudioWorst,
}

impl VideoQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::VideoBest => "video_best",
            VideoQuality::AudioBest => "audio_best",
            VideoQuality::VideoWorst => "video_worst",
            VideoQuality::AudioWorst => "audio_worst",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "video_best" => Some(VideoQuality::VideoBest),
            "audio_best" => Some(VideoQuality::AudioBest),
            "video_worst" => Some(VideoQuality::VideoWorst),
            "audio_worst" => Some(VideoQuality::AudioWorst),
            _ => None,
        }
    }
}

/// Listing filters; `None` fields are left out of the request
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadQuery {
    pub id: Option<String>,
    pub url: Option<String>,
    pub status: Option<TaskStatus>,
    pub quality: Option<VideoQuality>,
    pub location: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for DownloadQuery {
    fn default() -> Self {
        Self {
            id: None,
            url: None,
            status: None,
            quality: None,
            location: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DownloadQuery {
    pub fn to_body(&self) -> Value {
        let mut filters = Map::new();
        let text_filters = [("id", &self.id), ("url", &self.url), ("location", &self.location)];
        for (key, value) in text_filters {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                filters.insert(key.to_string(), Value::from(value));
            }
        }
        if let Some(status) = self.status {
            filters.insert("status".to_string(), Value::from(status.as_str()));
        }
        if let Some(quality) = self.quality {
            filters.insert("quality".to_string(), Value::from(quality.as_str()));
        }

        json!({
            "filters": filters,
            "page": self.page.max(1),
            "limit": self.limit.max(1),
        })
    }
}

/// Tasks currently being downloaded, from `GET /c`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningTasks {
    pub running_tasks: Vec<Task>,
    pub total: u64,
}

pub struct DownloadAdapter {
    transport: Arc<dyn TaskTransport>,
}

impl DownloadAdapter {
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self { transport }
    }

    async fn call_json(&self, request: ProxyRequest) -> Result<Value, AdapterError> {
        let proxied = self.transport.call(BACKEND, request).await?;
        expect_json(BACKEND, proxied.data)
    }

    pub async fn list_tasks(&self, query: &DownloadQuery) -> Result<TaskPage, AdapterError> {
        let value = self
            .call_json(ProxyRequest::post("/tasks/query", query.to_body()))
            .await?;
        normalize_page(BACKEND, value, query.limit.max(1), normalize_task)
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, AdapterError> {
        validate_task_id(id)?;
        let value = self.call_json(ProxyRequest::get(format!("/task/{}", id))).await?;
        match unwrap_data(value) {
            Value::Object(obj) => normalize_task(&obj),
            other => Err(AdapterError::UnexpectedShape {
                backend: BACKEND,
                detail: format!(
                    "task detail should be an object, got {}",
                    super::json_kind(&other)
                ),
            }),
        }
    }

    /// Submit a download; returns the backend-assigned task id
    pub async fn create_task(
        &self,
        url: &str,
        quality: VideoQuality,
    ) -> Result<String, AdapterError> {
        validate_source_url(url)?;

        let value = self
            .call_json(ProxyRequest::post(
                "/download",
                json!({ "url": url.trim(), "quality": quality.as_str() }),
            ))
            .await?;

        let obj = match unwrap_data(value) {
            Value::Object(obj) => obj,
            other => {
                return Err(AdapterError::UnexpectedShape {
                    backend: BACKEND,
                    detail: format!(
                        "create response should be an object, got {}",
                        super::json_kind(&other)
                    ),
                })
            }
        };
        string_field(&obj, &["taskId", "task_id", "id"]).ok_or_else(|| {
            AdapterError::UnexpectedShape {
                backend: BACKEND,
                detail: "create response has no taskId".to_string(),
            }
        })
    }

    /// Per-status counts from concurrent single-item listing queries
    pub async fn stats(&self) -> Result<TaskStats, AdapterError> {
        let queries = STATUSES.into_iter().map(|status| {
            let query = DownloadQuery {
                status: Some(status),
                limit: 1,
                ..DownloadQuery::default()
            };
            async move { self.list_tasks(&query).await.map(|page| (status, page.total)) }
        });
        let counts = futures::future::try_join_all(queries).await?;

        let mut stats = TaskStats::default();
        for (status, count) in counts {
            match status {
                TaskStatus::Pending => stats.pending = count,
                TaskStatus::Running => stats.running = count,
                TaskStatus::Success => stats.success = count,
                TaskStatus::Failed => stats.failed = count,
                TaskStatus::Queued => stats.queued = count,
            }
            stats.total += count;
        }
        Ok(stats)
    }

    pub async fn running_tasks(&self) -> Result<RunningTasks, AdapterError> {
        let value = unwrap_data(self.call_json(ProxyRequest::get("/c")).await?);
        let obj = value.as_object().ok_or_else(|| AdapterError::UnexpectedShape {
            backend: BACKEND,
            detail: format!("running tasks should be an object, got {}", super::json_kind(&value)),
        })?;

        let running_tasks = match field(obj, &["runningTasks", "running_tasks"]) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(normalize_task)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let total = count_field(obj, &["total"]).unwrap_or(running_tasks.len() as u64);

        Ok(RunningTasks {
            running_tasks,
            total,
        })
    }
}

/// Normalize one download task object
pub fn normalize_task(obj: &Map<String, Value>) -> Result<Task, AdapterError> {
    let id = string_field(obj, &["id", "taskId", "_id"]).ok_or_else(|| {
        AdapterError::UnexpectedShape {
            backend: BACKEND,
            detail: "task without id".to_string(),
        }
    })?;

    let quality = match string_field(obj, &["quality"]) {
        Some(raw) => VideoQuality::parse(&raw)
            .map(Quality::Video)
            .unwrap_or(Quality::Other(raw)),
        None => Quality::Video(VideoQuality::default()),
    };

    let status = match string_field(obj, &["status"]).as_deref().map(TaskStatus::parse) {
        // The download service has no queue; a queued task has simply not started
        Some(Some(TaskStatus::Queued)) => TaskStatus::Pending,
        Some(Some(status)) => status,
        Some(None) | None => {
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
        progress: None,
        language_array: None,
        backend: BACKEND,
        id,
    })
}

pub(crate) fn validate_task_id(id: &str) -> Result<(), AdapterError> {
    if id.is_empty() {
        return Err(AdapterError::Validation("task id is required".to_string()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        || id.contains("..")
    {
        return Err(AdapterError::Validation(format!("invalid task id: {:?}", id)));
    }
    Ok(())
}
