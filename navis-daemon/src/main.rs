use navis_core::auth::{ReplayGuard, SKEW_MS};
use navis_core::middleware::device_auth::DeviceAuthConfig;
use navis_core::middleware::rate_limit::create_ip_rate_limiter;
use navis_core::observability::logging::init_tracing;
use navis_daemon::config::DaemonConfig;
use navis_daemon::db::MemoryStore;
use navis_daemon::services::{ApprovalEngine, DeviceRegistry, EventBus, PairingCoordinator, PolicySet};
use navis_daemon::{build_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), navis_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = DaemonConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting control-plane daemon"
    );

    let store = Arc::new(MemoryStore::new());
    let events = EventBus::new();

    let registry = DeviceRegistry::new(store.clone(), events.clone());
    let engine = ApprovalEngine::new(store.clone(), PolicySet::default(), events.clone());
    let coordinator =
        PairingCoordinator::new(config.pairing_config(), engine.clone(), registry.clone());
    tracing::info!("Trust services initialized");

    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    let pairing_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.pairing_attempts,
        config.rate_limit.pairing_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Pairing and Global IP");

    let state = AppState {
        config: config.clone(),
        store,
        registry,
        engine,
        coordinator,
        events,
        replay_guard: Arc::new(ReplayGuard::new(SKEW_MS)),
        device_auth_config: DeviceAuthConfig::default(),
        ip_rate_limiter,
        pairing_rate_limiter,
    };

    let app = build_router(state);

    let bind_address: std::net::IpAddr = config
        .common
        .bind_address
        .parse()
        .map_err(|e| navis_core::error::AppError::ConfigError(anyhow::anyhow!("Invalid BIND_ADDRESS: {}", e)))?;
    let addr = SocketAddr::from((bind_address, config.common.port));

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Daemon shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
