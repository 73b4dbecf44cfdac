use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Device;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceListResponse {
    pub devices: Vec<Device>,
}
