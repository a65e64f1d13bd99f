//! `modifyRecord`: patch fields on the record the user is looking at

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use tablechat_airtable::{Fields, RecordUpdater};

use super::ToolTrait;
use crate::AgentError;

pub const TOOL_NAME: &str = "modifyRecord";

pub const SUCCESS_MESSAGE: &str = "Record updated successfully.";
pub const FAILURE_MESSAGE: &str = "Failed to update Airtable record.";

/// Arguments of one `modifyRecord` call
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModifyRecordRequest {
    pub record_id: String,
    pub table_name: String,
    pub updates: Fields,
}

impl ModifyRecordRequest {
    /// Parse model-supplied arguments; record and table must be non-blank
    pub fn from_args(args: Value) -> crate::Result<Self> {
        let request: Self = serde_json::from_value(args)
            .map_err(|e| AgentError::InvalidToolArguments(e.to_string()))?;

        if request.record_id.trim().is_empty() {
            return Err(AgentError::InvalidToolArguments(
                "recordId must not be empty".to_string(),
            ));
        }
        if request.table_name.trim().is_empty() {
            return Err(AgentError::InvalidToolArguments(
                "tableName must not be empty".to_string(),
            ));
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failed,
}

/// What the model is told about an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<Fields>,
}

impl ToolResult {
    pub fn success(updates: Fields) -> Self {
        Self {
            status: ToolStatus::Success,
            message: SUCCESS_MESSAGE.to_string(),
            updates: Some(updates),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: ToolStatus::Failed,
            message: FAILURE_MESSAGE.to_string(),
            updates: None,
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            json!({ "status": "failed", "message": FAILURE_MESSAGE }).to_string()
        })
    }
}

/// Applies record updates through a `RecordUpdater`
pub struct ModifyRecordTool {
    updater: Arc<dyn RecordUpdater>,
}

impl ModifyRecordTool {
    pub fn new(updater: Arc<dyn RecordUpdater>) -> Self {
        Self { updater }
    }

    /// Apply a parsed request; store failures become a `failed` result
    pub async fn apply(&self, request: ModifyRecordRequest) -> ToolResult {
        debug!(
            "Updating {}/{}: {:?}",
            request.table_name,
            request.record_id,
            request.updates.keys().collect::<Vec<_>>()
        );

        match self
            .updater
            .update_record(&request.table_name, &request.record_id, request.updates)
            .await
        {
            Ok(fields) => ToolResult::success(fields),
            Err(e) => {
                let err = AgentError::ToolExecution(e.to_string());
                error!("{} ({}/{})", err, request.table_name, request.record_id);
                ToolResult::failed()
            }
        }
    }
}

#[async_trait]
impl ToolTrait for ModifyRecordTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Update fields of an Airtable record. Only the listed fields change."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "recordId": { "type": "string", "description": "ID of the record to update" },
                "tableName": { "type": "string", "description": "Table the record belongs to" },
                "updates": {
                    "type": "object",
                    "description": "Field names mapped to their new values"
                }
            },
            "required": ["recordId", "tableName", "updates"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, args: Value) -> crate::Result<String> {
        let request = ModifyRecordRequest::from_args(args)?;
        Ok(self.apply(request).await.to_json_string())
    }
}
