use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// The payload a companion app scans or pastes to reach the daemon. The
/// shape is a small versioned envelope so clients can reject payloads from
/// incompatible daemons.
#[derive(Debug, Serialize, ToSchema)]
pub struct PairingPayload {
    #[serde(rename = "type")]
    #[schema(example = "navis-pairing")]
    pub kind: &'static str,
    #[schema(example = 1)]
    pub version: u32,
    #[schema(example = "http://192.168.1.20:7420")]
    pub origin: String,
    #[serde(rename = "pairingToken")]
    #[schema(example = "3F92A1C08D4E77B2A95C13F60B8D2E41")]
    pub pairing_token: String,
}

impl PairingPayload {
    pub fn new(origin: String, pairing_token: String) -> Self {
        Self {
            kind: "navis-pairing",
            version: 1,
            origin,
            pairing_token,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BeginPairingRequest {
    #[validate(length(min = 1, message = "Pairing token is required"))]
    #[schema(example = "3F92A1C08D4E77B2A95C13F60B8D2E41")]
    pub token: String,

    #[validate(length(min = 1, max = 64, message = "Device name must be 1-64 characters"))]
    #[schema(example = "Pixel 9")]
    pub device_name: String,

    /// Free-form client metadata shown to the human approving the pairing.
    pub device_info: Option<serde_json::Value>,
}
