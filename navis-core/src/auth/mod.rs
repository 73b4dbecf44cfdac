//! Device request authentication: canonical signing, header parsing, replay
//! protection.

pub mod header;
pub mod replay;
pub mod signature;

use thiserror::Error;

pub use header::{parse_authorization, SignedAuthorization, AUTH_SCHEME};
pub use replay::ReplayGuard;
pub use signature::{canonical_request, canonical_upgrade, sign_canonical, verify_canonical};

/// Maximum allowed clock skew between the signed timestamp and daemon time.
/// Also the replay-detection window.
pub const SKEW_MS: i64 = 5 * 60 * 1000;

/// A signed timestamp is fresh when it is within [`SKEW_MS`] of the daemon
/// clock. The window is inclusive on both ends.
pub fn is_fresh(ts_ms: i64, now_ms: i64) -> bool {
    (now_ms - ts_ms).abs() <= SKEW_MS
}

/// A classified authentication rejection. Every variant except `Backend`
/// surfaces as 401 with its machine code; `Backend` surfaces as 503 with
/// generic text.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Malformed authorization header")]
    InvalidAuthHeader,

    #[error("Invalid or stale timestamp")]
    InvalidTimestamp,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Device revoked")]
    DeviceRevoked,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Replay detected")]
    ReplayDetected,

    #[error("Authentication backend unavailable")]
    Backend(#[source] anyhow::Error),
}

impl AuthFailure {
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            AuthFailure::InvalidTimestamp => "INVALID_TIMESTAMP",
            AuthFailure::DeviceNotFound => "DEVICE_NOT_FOUND",
            AuthFailure::DeviceRevoked => "DEVICE_REVOKED",
            AuthFailure::InvalidSignature => "INVALID_SIGNATURE",
            AuthFailure::ReplayDetected => "REPLAY_DETECTED",
            AuthFailure::Backend(_) => "AUTH_UNAVAILABLE",
        }
    }
}
