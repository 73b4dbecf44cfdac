use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuance channel for a pairing token; the channel decides the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Qr,
    Manual,
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenPurpose::Qr => write!(f, "qr"),
            TokenPurpose::Manual => write!(f, "manual"),
        }
    }
}

/// A short-lived, single-use pairing credential. Consumed the moment it
/// resolves into a device or expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingToken {
    pub token: String,
    pub purpose: TokenPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PairingToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let token = PairingToken {
            token: "AB12".to_string(),
            purpose: TokenPurpose::Qr,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        };
        assert!(!token.is_expired(now + Duration::minutes(5)));
        assert!(token.is_expired(now + Duration::minutes(5) + Duration::seconds(1)));
    }
}
