use axum::{
    extract::{Path, State},
    Json,
};
use navis_core::error::AppError;

use crate::dtos::device::DeviceListResponse;
use crate::models::Device;
use crate::AppState;

/// List trusted devices
#[utoipa::path(
    get,
    path = "/api/devices",
    responses(
        (status = 200, description = "Active paired devices", body = DeviceListResponse),
        (status = 401, description = "Authentication failed", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Devices"
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<DeviceListResponse>, AppError> {
    let devices = state.registry.find_active().await?;
    Ok(Json(DeviceListResponse { devices }))
}

/// Revoke a device
#[utoipa::path(
    delete,
    path = "/api/devices/{id}",
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Device revoked", body = Device),
        (status = 404, description = "Device not found", body = crate::dtos::ErrorResponse)
    ),
    security(("device_signature" = [])),
    tag = "Devices"
)]
pub async fn revoke(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Device>, AppError> {
    let device = state.registry.revoke(&id).await?;
    Ok(Json(device))
}
