use axum::{extract::State, Json};
use navis_core::error::AppError;

use crate::dtos::pairing::{BeginPairingRequest, PairingPayload};
use crate::models::TokenPurpose;
use crate::services::PairingGrant;
use crate::utils::ValidatedJson;
use crate::AppState;

/// Pairing payload for QR display
#[utoipa::path(
    get,
    path = "/api/pairing/qr",
    responses(
        (status = 200, description = "Pairing payload with a short-lived QR token", body = PairingPayload),
        (status = 429, description = "Rate limited", body = crate::dtos::ErrorResponse)
    ),
    tag = "Pairing"
)]
pub async fn qr_payload(State(state): State<AppState>) -> Result<Json<PairingPayload>, AppError> {
    let token = state.coordinator.issue_token(TokenPurpose::Qr);
    Ok(Json(PairingPayload::new(
        state.coordinator.config().api_base_url.clone(),
        token.token,
    )))
}

/// Pairing payload for manual entry
#[utoipa::path(
    get,
    path = "/api/pairing/data",
    responses(
        (status = 200, description = "Pairing payload with a manual-entry token", body = PairingPayload),
        (status = 429, description = "Rate limited", body = crate::dtos::ErrorResponse)
    ),
    tag = "Pairing"
)]
pub async fn data_payload(State(state): State<AppState>) -> Result<Json<PairingPayload>, AppError> {
    let token = state.coordinator.issue_token(TokenPurpose::Manual);
    Ok(Json(PairingPayload::new(
        state.coordinator.config().api_base_url.clone(),
        token.token,
    )))
}

/// Redeem a pairing token
///
/// Blocks until a human approves or denies the pairing, or the wait deadline
/// passes.
#[utoipa::path(
    post,
    path = "/api/pairing/begin",
    request_body = BeginPairingRequest,
    responses(
        (status = 200, description = "Pairing approved; one-time device credentials", body = PairingGrant),
        (status = 400, description = "Invalid or expired pairing token", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Pairing denied", body = crate::dtos::ErrorResponse),
        (status = 408, description = "Pairing timed out", body = crate::dtos::ErrorResponse)
    ),
    tag = "Pairing"
)]
pub async fn begin(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<BeginPairingRequest>,
) -> Result<Json<PairingGrant>, AppError> {
    let grant = state
        .coordinator
        .begin_pairing(&req.token, &req.device_name, req.device_info)
        .await?;
    Ok(Json(grant))
}
