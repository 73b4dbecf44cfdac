use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::{ApprovalAction, ApprovalRequest, ApprovalStatus};
use crate::services::BatchItemOutcome;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateApprovalRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Approval type is required"))]
    #[schema(example = "terminal_command")]
    pub kind: String,

    #[schema(example = json!({"command": "cargo publish"}))]
    pub payload: serde_json::Value,

    #[schema(example = "proj-42")]
    pub project_id: Option<String>,

    pub priority: Option<i64>,

    /// Overrides the policy timeout for this request.
    #[validate(range(min = 1, max = 3600, message = "Timeout must be 1-3600 seconds"))]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateApprovalResponse {
    pub approval: ApprovalView,
    /// True when policy resolved the request without involving a human.
    pub auto_approved: bool,
}

/// The wire representation of an approval record.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovalView {
    pub id: String,
    #[serde(rename = "type")]
    #[schema(example = "terminal_command")]
    pub kind: String,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<ApprovalRequest> for ApprovalView {
    fn from(request: ApprovalRequest) -> Self {
        Self {
            id: request.id,
            kind: request.kind.to_string(),
            payload: request.payload,
            project_id: request.project_id,
            priority: request.priority,
            status: request.status,
            created_at: request.created_at,
            resolved_at: request.resolved_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PendingQuery {
    #[serde(rename = "type")]
    #[param(example = "terminal_command")]
    pub kind: Option<String>,
    pub project_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingResponse {
    pub approvals: Vec<ApprovalView>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResolveApprovalRequest {
    pub action: ApprovalAction,
    #[schema(example = "user-1")]
    pub user_id: Option<String>,
    #[schema(example = "Looks safe")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchResolveRequest {
    #[validate(length(min = 1, message = "At least one approval id is required"))]
    pub ids: Vec<String>,
    pub action: ApprovalAction,
    pub user_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResolveItem {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchItemOutcome> for BatchResolveItem {
    fn from(item: BatchItemOutcome) -> Self {
        match item.outcome {
            Ok(request) => Self {
                id: item.id,
                ok: true,
                status: Some(request.status),
                error: None,
            },
            Err(err) => Self {
                id: item.id,
                ok: false,
                status: None,
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResolveResponse {
    pub results: Vec<BatchResolveItem>,
}
