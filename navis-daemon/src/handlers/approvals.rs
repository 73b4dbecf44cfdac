use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use navis_core::error::AppError;
use std::time::Duration;

use crate::dtos::approval::{
    ApprovalView, BatchResolveRequest, BatchResolveResponse, CreateApprovalRequest,
    CreateApprovalResponse, PendingQuery, PendingResponse, ResolveApprovalRequest,
};
use crate::models::ApprovalType;
use crate::services::{ApprovalStats, CreateOutcome, ResolveOptions};
use crate::utils::ValidatedJson;
use crate::AppState;

/// List pending approvals
#[utoipa::path(
    get,
    path = "/api/approvals/pending",
    params(PendingQuery),
    responses(
        (status = 200, description = "Pending approvals, oldest first", body = PendingResponse),
        (status = 401, description = "Authentication failed", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Approvals"
)]
pub async fn pending(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<PendingResponse>, AppError> {
    let kind = query.kind.map(|k| ApprovalType::from(k.as_str()));
    let approvals = state
        .engine
        .get_pending(kind, query.project_id, query.limit)
        .await?
        .into_iter()
        .map(ApprovalView::from)
        .collect();
    Ok(Json(PendingResponse { approvals }))
}

/// Request approval for a privileged operation
#[utoipa::path(
    post,
    path = "/api/approvals",
    request_body = CreateApprovalRequest,
    responses(
        (status = 201, description = "Approval created or auto-approved", body = CreateApprovalResponse),
        (status = 401, description = "Authentication failed", body = crate::dtos::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Approvals"
)]
pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateApprovalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .engine
        .create_approval(
            ApprovalType::from(req.kind.as_str()),
            req.payload,
            req.project_id,
            req.priority,
            req.timeout_seconds.map(Duration::from_secs),
        )
        .await?;

    let (approval, auto_approved) = match outcome {
        CreateOutcome::AutoApproved(request) => (request, true),
        CreateOutcome::Pending(request) => (request, false),
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateApprovalResponse {
            approval: approval.into(),
            auto_approved,
        }),
    ))
}

/// Resolve a pending approval
#[utoipa::path(
    post,
    path = "/api/approvals/{id}/resolve",
    params(("id" = String, Path, description = "Approval id")),
    request_body = ResolveApprovalRequest,
    responses(
        (status = 200, description = "Approval resolved", body = ApprovalView),
        (status = 404, description = "Approval not found", body = crate::dtos::ErrorResponse),
        (status = 409, description = "Approval already resolved", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Approvals"
)]
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ResolveApprovalRequest>,
) -> Result<Json<ApprovalView>, AppError> {
    let resolved = state
        .engine
        .resolve_approval(
            &id,
            req.action,
            ResolveOptions {
                user_id: req.user_id,
                reason: req.reason,
            },
        )
        .await?;
    Ok(Json(resolved.into()))
}

/// Resolve several approvals at once
#[utoipa::path(
    post,
    path = "/api/approvals/batch",
    request_body = BatchResolveRequest,
    responses(
        (status = 200, description = "Per-id outcomes", body = BatchResolveResponse),
        (status = 401, description = "Authentication failed", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Approvals"
)]
pub async fn batch(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BatchResolveRequest>,
) -> Result<Json<BatchResolveResponse>, AppError> {
    let results = state
        .engine
        .batch_resolve(
            &req.ids,
            req.action,
            ResolveOptions {
                user_id: req.user_id,
                reason: req.reason,
            },
        )
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(BatchResolveResponse { results }))
}

/// Approval counts by status
#[utoipa::path(
    get,
    path = "/api/approvals/stats",
    responses(
        (status = 200, description = "Counts by status and type", body = ApprovalStats),
        (status = 401, description = "Authentication failed", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Approvals"
)]
pub async fn stats(State(state): State<AppState>) -> Result<Json<ApprovalStats>, AppError> {
    Ok(Json(state.engine.stats().await?))
}
