//! Shared harness for daemon integration tests: an in-memory application
//! plus request-signing helpers.

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use chrono::Utc;
use navis_core::auth::{canonical_request, sign_canonical, ReplayGuard, AUTH_SCHEME, SKEW_MS};
use navis_core::middleware::device_auth::DeviceAuthConfig;
use navis_core::middleware::rate_limit::create_ip_rate_limiter;
use navis_daemon::config::{
    DaemonConfig, Environment, PairingSettings, RateLimitConfig, SecurityConfig, SwaggerConfig,
    SwaggerMode,
};
use navis_daemon::db::MemoryStore;
use navis_daemon::services::{
    ApprovalEngine, DeviceRegistry, EventBus, IssuedDevice, PairingConfig, PairingCoordinator,
    PolicySet,
};
use navis_daemon::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with_pairing(PairingConfig::default())
    }

    pub fn origin() -> &'static str {
        "http://127.0.0.1:7420"
    }

    pub fn spawn_with_pairing(pairing: PairingConfig) -> Self {
        let pairing = PairingConfig {
            api_base_url: Self::origin().to_string(),
            ..pairing
        };
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let events = EventBus::new();
        let registry = DeviceRegistry::new(store.clone(), events.clone());
        let engine = ApprovalEngine::new(store.clone(), PolicySet::default(), events.clone());
        let coordinator = PairingCoordinator::new(pairing, engine.clone(), registry.clone());

        let state = AppState {
            config,
            store,
            registry,
            engine,
            coordinator,
            events,
            replay_guard: Arc::new(ReplayGuard::new(SKEW_MS)),
            device_auth_config: DeviceAuthConfig::default(),
            ip_rate_limiter: create_ip_rate_limiter(10_000, 60),
            pairing_rate_limiter: create_ip_rate_limiter(10_000, 60),
        };

        let router = build_router(state.clone());
        Self { state, router }
    }

    pub async fn pair_device(&self, name: &str) -> IssuedDevice {
        self.state
            .registry
            .issue(name)
            .await
            .expect("Failed to issue device")
    }
}

fn test_config() -> DaemonConfig {
    DaemonConfig {
        common: navis_core::config::Config {
            port: 7420,
            bind_address: "127.0.0.1".to_string(),
        },
        environment: Environment::Dev,
        service_name: "navis-daemon".to_string(),
        service_version: "test".to_string(),
        log_level: "warn".to_string(),
        pairing: PairingSettings {
            qr_token_ttl_seconds: 300,
            manual_token_ttl_seconds: 600,
            wait_timeout_seconds: 120,
            api_base_url: "http://127.0.0.1:7420".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
            pairing_attempts: 10_000,
            pairing_window_seconds: 60,
        },
    }
}

/// Build a signed request the way a paired companion app would.
pub fn signed_request(
    device_id: &str,
    secret: &str,
    method: Method,
    path_with_query: &str,
    body: &[u8],
) -> Request<Body> {
    let timestamp = Utc::now().to_rfc3339();
    signed_request_at(device_id, secret, method, path_with_query, body, &timestamp)
}

pub fn signed_request_at(
    device_id: &str,
    secret: &str,
    method: Method,
    path_with_query: &str,
    body: &[u8],
    timestamp: &str,
) -> Request<Body> {
    let canonical = canonical_request(method.as_str(), path_with_query, body, timestamp);
    let signature = sign_canonical(secret, &canonical).expect("Failed to sign request");

    let mut builder = Request::builder()
        .method(method)
        .uri(path_with_query)
        .header(
            header::AUTHORIZATION,
            format!(
                "{} deviceId=\"{}\",signature=\"{}\",timestamp=\"{}\"",
                AUTH_SCHEME, device_id, signature, timestamp
            ),
        );
    if !body.is_empty() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder
        .body(Body::from(body.to_vec()))
        .expect("Failed to build request")
}

pub fn unsigned_request(method: Method, path: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("Failed to encode body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("Failed to build request")
}

pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

/// A stale RFC 3339 timestamp just past the acceptance window.
pub fn stale_timestamp() -> String {
    (Utc::now() - chrono::Duration::milliseconds(SKEW_MS + 60_000)).to_rfc3339()
}
