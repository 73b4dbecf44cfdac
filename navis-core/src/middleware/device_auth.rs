use crate::auth::{
    canonical_request, canonical_upgrade, is_fresh, parse_authorization, verify_canonical,
    AuthFailure, ReplayGuard,
};
use crate::error::AppError;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;

/// Paths covered by device authentication. Everything outside these prefixes
/// bypasses the subsystem entirely.
#[derive(Clone, Debug)]
pub struct DeviceAuthConfig {
    pub protected_prefixes: Vec<String>,
}

impl Default for DeviceAuthConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: [
                "/api/projects",
                "/api/sessions",
                "/api/approvals",
                "/api/devices",
                "/api/discovery",
                "/api/logs",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }
}

/// Signing-key lookup outcome for a device id.
#[derive(Debug)]
pub enum KeyLookup {
    Found(String),
    NotFound,
    Revoked,
}

/// Trust-store access required by the authenticator, implemented by the
/// daemon's AppState.
#[async_trait]
pub trait DeviceAuthStore: Send + Sync {
    async fn signing_key(&self, device_id: &str) -> Result<KeyLookup, anyhow::Error>;
    async fn touch_last_seen(&self, device_id: &str) -> Result<(), anyhow::Error>;
    fn replay_guard(&self) -> &ReplayGuard;
}

/// Authenticated-identity marker attached to the request extensions on
/// success.
#[derive(Clone, Debug)]
pub struct AuthenticatedDevice {
    pub device_id: String,
}

pub async fn device_auth_middleware<S>(
    State(state): State<S>,
    req: Request,
    next: Next,
) -> Result<Response, AppError>
where
    S: AsRef<DeviceAuthConfig> + DeviceAuthStore + Clone + Send + Sync + 'static,
{
    let config: &DeviceAuthConfig = state.as_ref();
    let path = req.uri().path().to_string();

    if !config
        .protected_prefixes
        .iter()
        .any(|p| path.starts_with(p.as_str()))
    {
        return Ok(next.run(req).await);
    }

    match authenticate(&state, req).await {
        Ok(req) => Ok(next.run(req).await),
        Err((device_id, failure)) => {
            // Enough context to audit, never the signature or key material.
            tracing::warn!(
                device_id = %device_id.as_deref().unwrap_or("-"),
                code = failure.code(),
                path = %path,
                "Rejected device request"
            );
            Err(AppError::AuthError(failure))
        }
    }
}

async fn authenticate<S>(state: &S, req: Request) -> Result<Request, (Option<String>, AuthFailure)>
where
    S: DeviceAuthStore,
{
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or((None, AuthFailure::InvalidAuthHeader))?;

    let signed = parse_authorization(authorization).map_err(|e| (None, e))?;
    let device_id = signed.device_id.clone();
    let fail = |f: AuthFailure| (Some(device_id.clone()), f);

    let timestamp_ms = chrono::DateTime::parse_from_rfc3339(&signed.timestamp)
        .map_err(|_| fail(AuthFailure::InvalidTimestamp))?
        .timestamp_millis();
    let now_ms = chrono::Utc::now().timestamp_millis();
    if !is_fresh(timestamp_ms, now_ms) {
        return Err(fail(AuthFailure::InvalidTimestamp));
    }

    let key = match state
        .signing_key(&signed.device_id)
        .await
        .map_err(|e| fail(AuthFailure::Backend(e)))?
    {
        KeyLookup::Found(key) => key,
        KeyLookup::NotFound => return Err(fail(AuthFailure::DeviceNotFound)),
        KeyLookup::Revoked => return Err(fail(AuthFailure::DeviceRevoked)),
    };

    let is_upgrade = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    let (parts, body) = req.into_parts();
    let path_with_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let bytes = body
        .collect()
        .await
        .map_err(|e| fail(AuthFailure::Backend(anyhow::anyhow!("Failed to read body: {}", e))))?
        .to_bytes();

    let canonical = if is_upgrade {
        canonical_upgrade(&path_with_query, &signed.timestamp)
    } else {
        canonical_request(parts.method.as_str(), &path_with_query, &bytes, &signed.timestamp)
    };

    let verified = verify_canonical(&key, &canonical, &signed.signature)
        .map_err(|e| fail(AuthFailure::Backend(e)))?;
    if !verified {
        return Err(fail(AuthFailure::InvalidSignature));
    }

    if !state
        .replay_guard()
        .check_and_record(&signed.device_id, &signed.signature, timestamp_ms)
    {
        return Err(fail(AuthFailure::ReplayDetected));
    }

    state
        .touch_last_seen(&signed.device_id)
        .await
        .map_err(|e| fail(AuthFailure::Backend(e)))?;

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(AuthenticatedDevice {
        device_id: signed.device_id,
    });
    Ok(req)
}
