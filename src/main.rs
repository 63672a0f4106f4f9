//! FleetWatch Server — fleet monitoring and remote task execution.
//!
//! Main entry point that wires all crates together: database, security
//! primitives, plugin manager, event dispatch, alert channels, and the
//! startup recovery pass.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use fleetwatch_core::config::AppConfig;
use fleetwatch_core::error::AppError;
use fleetwatch_core::result::AppResult;
use fleetwatch_database::DatabasePool;
use fleetwatch_database::store::{
    PgAuditStore, PgSessionStore, PgTaskStore, PgUserStore, PgWebhookStore, Repositories,
};
use fleetwatch_events::{EventDispatcher, PluginManager, PluginRegistry, WebhookDispatcher};
use fleetwatch_notify::AlertManager;
use fleetwatch_recovery::{RecoverySummary, StartupRecovery};
use fleetwatch_security::{CommandPolicy, RateLimiter, SecretVault};

/// Rate-limiter buckets idle this long are evicted by the retention task.
const IDLE_BUCKET_AGE: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    let env = std::env::var("FLEETWATCH_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Shared state for the status endpoints.
struct ServerState {
    db: DatabasePool,
    plugins: Vec<String>,
    alert_channels: Vec<String>,
    policy: Arc<CommandPolicy>,
    rate_limiter: Arc<RateLimiter>,
    recovery: RecoverySummary,
}

/// Main server run function.
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!("Starting FleetWatch v{}", env!("CARGO_PKG_VERSION"));

    // Database connection + migrations
    let db = DatabasePool::connect(&config.database).await?;
    fleetwatch_database::migration::run_migrations(db.pool()).await?;

    // Security primitives
    let vault = Arc::new(SecretVault::from_config(&config.vault)?);
    let policy = Arc::new(CommandPolicy::from_config(&config.policy));
    let rate_limiter = Arc::new(RateLimiter::new());
    tracing::info!(mode = ?policy.mode(), "task command policy loaded");

    // Repositories and storage adapters
    let repos = Repositories::new(db.pool().clone(), Arc::clone(&vault));

    // Plugin manager
    let registry = PluginRegistry::with_builtins();
    let plugin_manager = Arc::new(PluginManager::from_config(&config.plugins, &registry));
    tracing::info!(plugins = ?plugin_manager.loaded(), "plugin manager initialized");

    // Event dispatch chain
    let webhook_dispatcher = WebhookDispatcher::new(
        Arc::new(PgWebhookStore::new(&repos)),
        config.webhooks.clone(),
    )?;
    let dispatcher = Arc::new(EventDispatcher::new(
        Arc::clone(&plugin_manager),
        webhook_dispatcher,
        Arc::new(PgAuditStore::new(&repos)),
    ));

    // Alert manager
    let alert_manager = Arc::new(AlertManager::from_config(
        &config.alerts,
        Arc::clone(&dispatcher),
    )?);
    tracing::info!(channels = ?alert_manager.enabled_channels(), "alert manager initialized");

    // Startup recovery runs before the server accepts traffic.
    let recovery = StartupRecovery::new(
        Arc::new(PgTaskStore::new(&repos)),
        Arc::new(PgSessionStore::new(&repos)),
        Arc::new(PgUserStore::new(&repos)),
        Arc::clone(&dispatcher),
        config.recovery.clone(),
    );
    let recovery_summary = recovery.run().await;
    if let Some(error) = &recovery_summary.error {
        tracing::warn!(error = %error, "startup recovery completed with errors");
    }

    plugin_manager.notify_startup().await;

    // Shutdown channel + background retention task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let retention_handle = spawn_retention_task(
        &config,
        &repos,
        Arc::clone(&rate_limiter),
        shutdown_rx.clone(),
    );

    // HTTP server
    let state = Arc::new(ServerState {
        db: db.clone(),
        plugins: plugin_manager
            .loaded()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        alert_channels: alert_manager
            .enabled_channels()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        policy,
        rate_limiter,
        recovery: recovery_summary,
    });
    let app = Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!("FleetWatch server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    plugin_manager.notify_shutdown().await;
    let _ = tokio::time::timeout(
        Duration::from_secs(config.server.shutdown_grace_seconds),
        retention_handle,
    )
    .await;
    db.close().await;

    tracing::info!("FleetWatch server shut down gracefully");
    Ok(())
}

/// Periodically trim the audit and delivery logs to the retention window
/// and evict idle rate-limiter buckets.
fn spawn_retention_task(
    config: &AppConfig,
    repos: &Repositories,
    rate_limiter: Arc<RateLimiter>,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let retention_days = config.recovery.audit_retention_days;
    let interval = Duration::from_secs(config.recovery.audit_cleanup_interval_hours * 3600);
    let audit = repos.audit.clone();
    let deliveries = repos.deliveries.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so startup stays quick.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match audit.delete_older_than(retention_days).await {
                        Ok(removed) => {
                            tracing::info!(removed, retention_days, "audit log trimmed")
                        }
                        Err(e) => tracing::warn!(error = %e, "audit log trim failed"),
                    }
                    match deliveries.delete_older_than(retention_days).await {
                        Ok(removed) => {
                            tracing::info!(removed, retention_days, "delivery log trimmed")
                        }
                        Err(e) => tracing::warn!(error = %e, "delivery log trim failed"),
                    }
                    rate_limiter.purge_idle(IDLE_BUCKET_AGE);
                    tracing::debug!(
                        tracked_keys = rate_limiter.tracked_keys(),
                        "rate limiter buckets purged"
                    );
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

/// Liveness probe backed by a database round-trip.
async fn health(State(state): State<Arc<ServerState>>) -> (StatusCode, &'static str) {
    match state.db.health_check().await {
        Ok(true) => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "database unreachable"),
    }
}

/// Operational snapshot for dashboards and startup checks.
async fn status(State(state): State<Arc<ServerState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "policy_mode": state.policy.mode(),
        "rate_limited_keys": state.rate_limiter.tracked_keys(),
        "plugins": state.plugins,
        "alert_channels": state.alert_channels,
        "recovery": state.recovery,
    }))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
