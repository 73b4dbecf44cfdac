pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use navis_core::auth::ReplayGuard;
use navis_core::error::AppError;
use navis_core::middleware::device_auth::{
    device_auth_middleware, DeviceAuthConfig, DeviceAuthStore, KeyLookup,
};
use navis_core::middleware::rate_limit::{ip_rate_limit_middleware, IpRateLimiter};
use navis_core::middleware::security_headers::security_headers_middleware;
use navis_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::DaemonConfig;
use crate::db::{DeviceRepository, MemoryStore};
use crate::services::{ApprovalEngine, DeviceRegistry, EventBus, PairingCoordinator};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::pairing::qr_payload,
        handlers::pairing::data_payload,
        handlers::pairing::begin,
        handlers::approvals::pending,
        handlers::approvals::create,
        handlers::approvals::resolve,
        handlers::approvals::batch,
        handlers::approvals::stats,
        handlers::devices::list,
        handlers::devices::revoke,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::pairing::PairingPayload,
            dtos::pairing::BeginPairingRequest,
            dtos::approval::CreateApprovalRequest,
            dtos::approval::CreateApprovalResponse,
            dtos::approval::ApprovalView,
            dtos::approval::PendingResponse,
            dtos::approval::ResolveApprovalRequest,
            dtos::approval::BatchResolveRequest,
            dtos::approval::BatchResolveItem,
            dtos::approval::BatchResolveResponse,
            dtos::device::DeviceListResponse,
            models::Device,
            models::ApprovalStatus,
            models::ApprovalAction,
            services::ApprovalStats,
            services::PairingGrant,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Pairing", description = "Device trust establishment"),
        (name = "Approvals", description = "Human-in-the-loop approval workflow"),
        (name = "Devices", description = "Trusted device registry"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "device_signature",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("authorization"))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: DaemonConfig,
    pub store: Arc<MemoryStore>,
    pub registry: DeviceRegistry,
    pub engine: ApprovalEngine,
    pub coordinator: PairingCoordinator,
    pub events: EventBus,
    pub replay_guard: Arc<ReplayGuard>,
    pub device_auth_config: DeviceAuthConfig,
    pub ip_rate_limiter: IpRateLimiter,
    pub pairing_rate_limiter: IpRateLimiter,
}

impl AsRef<DeviceAuthConfig> for AppState {
    fn as_ref(&self) -> &DeviceAuthConfig {
        &self.device_auth_config
    }
}

#[axum::async_trait]
impl DeviceAuthStore for AppState {
    async fn signing_key(&self, device_id: &str) -> Result<KeyLookup, anyhow::Error> {
        let device = DeviceRepository::find_by_id(self.store.as_ref(), device_id)
            .await
            .map_err(anyhow::Error::new)?;
        Ok(match device {
            Some(device) if device.revoked => KeyLookup::Revoked,
            Some(device) => KeyLookup::Found(device.signing_secret),
            None => KeyLookup::NotFound,
        })
    }

    async fn touch_last_seen(&self, device_id: &str) -> Result<(), anyhow::Error> {
        self.registry
            .touch_last_seen(device_id)
            .await
            .map_err(anyhow::Error::new)
    }

    fn replay_guard(&self) -> &ReplayGuard {
        &self.replay_guard
    }
}

pub fn build_router(state: AppState) -> Router {
    // Pairing endpoints are unauthenticated by nature and get their own
    // tighter rate limit.
    let pairing_limiter = state.pairing_rate_limiter.clone();
    let pairing_routes = Router::new()
        .route("/api/pairing/qr", get(handlers::pairing::qr_payload))
        .route("/api/pairing/data", get(handlers::pairing::data_payload))
        .route("/api/pairing/begin", post(handlers::pairing::begin))
        .layer(from_fn_with_state(pairing_limiter, ip_rate_limit_middleware));

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => state.config.swagger.enabled == config::SwaggerMode::Public,
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let ip_limiter = state.ip_rate_limiter.clone();

    app.merge(pairing_routes)
        .route("/api/approvals/pending", get(handlers::approvals::pending))
        .route("/api/approvals", post(handlers::approvals::create))
        .route(
            "/api/approvals/:id/resolve",
            post(handlers::approvals::resolve),
        )
        .route("/api/approvals/batch", post(handlers::approvals::batch))
        .route("/api/approvals/stats", get(handlers::approvals::stats))
        .route("/api/devices", get(handlers::devices::list))
        .route("/api/devices/:id", delete(handlers::devices::revoke))
        .layer(from_fn_with_state(
            state.clone(),
            device_auth_middleware::<AppState>,
        ))
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .filter_map(|o| o.parse::<HeaderValue>().ok())
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Prove the store answers before reporting healthy.
    DeviceRepository::find_all(state.store.as_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Store health check failed");
            AppError::ServiceUnavailable
        })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "store": "up"
        }
    })))
}
