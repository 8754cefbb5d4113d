//! Log-viewer registry stored on the transcription backend under `/admin-log`

use super::download::validate_task_id;
use super::{expect_json, json_kind, string_field, unwrap_data, AdapterError, TaskTransport};
use crate::core::network::{Backend, HttpMethod, ProxyRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

const BACKEND: Backend = Backend::Transcription;
const COLLECTION: &str = "/admin-log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLog {
    pub id: String,
    pub name: String,
    pub address: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAdminLog {
    pub name: String,
    pub address: String,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateAdminLog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl CreateAdminLog {
    fn validate(&self) -> Result<(), AdapterError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("address", &self.address)
    }
}

impl UpdateAdminLog {
    fn validate(&self) -> Result<(), AdapterError> {
        if self.name.is_none() && self.address.is_none() {
            return Err(AdapterError::Validation("nothing to update".to_string()));
        }
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(address) = &self.address {
            require_non_empty("address", address)?;
        }
        Ok(())
    }
}

pub struct AdminLogClient {
    transport: Arc<dyn TaskTransport>,
}

impl AdminLogClient {
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self { transport }
    }

    async fn call_json(&self, request: ProxyRequest) -> Result<Value, AdapterError> {
        let proxied = self.transport.call(BACKEND, request).await?;
        expect_json(BACKEND, proxied.data)
    }

    pub async fn list(&self) -> Result<Vec<AdminLog>, AdapterError> {
        let items = match self.call_json(ProxyRequest::get(COLLECTION)).await? {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            Value::Null => Vec::new(),
            other => {
                return Err(AdapterError::UnexpectedShape {
                    backend: BACKEND,
                    detail: format!("admin log list should be an array, got {}", json_kind(&other)),
                })
            }
        };

        items
            .iter()
            .filter_map(Value::as_object)
            .map(normalize_admin_log)
            .collect()
    }

    pub async fn get(&self, id: &str) -> Result<AdminLog, AdapterError> {
        validate_task_id(id)?;
        let value = self.call_json(ProxyRequest::get(item_path(id))).await?;
        admin_log_from_value(value)
    }

    pub async fn create(&self, entry: &CreateAdminLog) -> Result<AdminLog, AdapterError> {
        entry.validate()?;
        let body = serde_json::json!({
            "name": entry.name.trim(),
            "address": entry.address.trim(),
        });
        let value = self.call_json(ProxyRequest::post(COLLECTION, body)).await?;
        admin_log_from_value(value)
    }

    pub async fn update(
        &self,
        id: &str,
        changes: &UpdateAdminLog,
    ) -> Result<AdminLog, AdapterError> {
        validate_task_id(id)?;
        changes.validate()?;
        let body = serde_json::to_value(changes)
            .map_err(|e| AdapterError::Validation(format!("cannot encode update: {}", e)))?;
        let value = self
            .call_json(ProxyRequest::new(HttpMethod::Put, item_path(id)).with_body(body))
            .await?;
        admin_log_from_value(value)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AdapterError> {
        validate_task_id(id)?;
        self.call_json(ProxyRequest::delete(item_path(id))).await?;
        Ok(())
    }
}

fn item_path(id: &str) -> String {
    format!("{}/{}", COLLECTION, id)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AdapterError> {
    if value.trim().is_empty() {
        return Err(AdapterError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn admin_log_from_value(value: Value) -> Result<AdminLog, AdapterError> {
    match unwrap_data(value) {
        Value::Object(obj) => normalize_admin_log(&obj),
        other => Err(AdapterError::UnexpectedShape {
            backend: BACKEND,
            detail: format!("admin log should be an object, got {}", json_kind(&other)),
        }),
    }
}

fn normalize_admin_log(obj: &Map<String, Value>) -> Result<AdminLog, AdapterError> {
    let id = string_field(obj, &["id", "_id"]).ok_or_else(|| AdapterError::UnexpectedShape {
        backend: BACKEND,
        detail: "admin log without id".to_string(),
    })?;

    Ok(AdminLog {
        id,
        name: string_field(obj, &["name"]).unwrap_or_default(),
        address: string_field(obj, &["address"]).unwrap_or_default(),
        created_at: string_field(obj, &["created_at", "createdAt"]).unwrap_or_default(),
    })
}
