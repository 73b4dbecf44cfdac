use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A trusted device in the registry.
///
/// `signing_secret` is the HMAC key for this device's signed requests. It is
/// handed to the device exactly once at pairing time and is excluded from
/// every serialized representation; `secret_digest` is the one-way SHA-256
/// fingerprint safe to expose for display and audit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Device {
    pub id: String,
    pub display_name: String,
    pub secret_digest: String,
    #[serde(skip)]
    pub signing_secret: String,
    pub paired_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub revoked: bool,
}

impl Device {
    pub fn new(id: String, display_name: String, signing_secret: String, secret_digest: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name,
            secret_digest,
            signing_secret,
            paired_at: now,
            last_seen_at: now,
            revoked: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_secret_never_serialized() {
        let device = Device::new(
            "dev-1".to_string(),
            "Pixel 9".to_string(),
            "super-secret".to_string(),
            "digest".to_string(),
        );
        let json = serde_json::to_string(&device).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(json.contains("digest"));
    }
}
