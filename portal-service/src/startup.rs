//! Application startup and lifecycle management.

use crate::config::PortalConfig;
use crate::handlers;
use crate::services::drive::DriveClient;
use crate::services::drive::google::GoogleDrive;
use crate::services::providers::TextProvider;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::{SessionStore, TenantDirectory};
use axum::{
    Router,
    routing::{get, post, put},
};
use portal_core::error::AppError;
use portal_core::middleware::rate_limit::{IpRateLimiter, create_ip_rate_limiter};
use portal_core::quota::QuotaTracker;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// How often stale quota buckets are swept.
const QUOTA_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub tenants: Arc<TenantDirectory>,
    pub quota: Arc<QuotaTracker>,
    pub sessions: Arc<SessionStore>,
    pub drive: Arc<dyn DriveClient>,
    pub text_provider: Arc<dyn TextProvider>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    login_limiter: IpRateLimiter,
}

impl Application {
    /// Build the application with production collaborators.
    pub async fn build(config: PortalConfig) -> Result<Self, AppError> {
        let drive = GoogleDrive::from_service_account_json(&config.google.service_account_json)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let gemini_config = GeminiConfig::new(
            config.google.api_key.clone(),
            config.models.text_model.clone(),
        );
        let text_provider: Arc<dyn TextProvider> = Arc::new(GeminiTextProvider::new(gemini_config));

        tracing::info!(
            model = %config.models.text_model,
            "Initialized Gemini text provider"
        );

        Self::build_with_collaborators(config, Arc::new(drive), text_provider).await
    }

    /// Build with injected collaborators; tests use this to swap in the
    /// mock Drive tree and mock provider.
    pub async fn build_with_collaborators(
        config: PortalConfig,
        drive: Arc<dyn DriveClient>,
        text_provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let tenants = Arc::new(TenantDirectory::from_json(&config.tenant_database_json)?);
        let login_limiter =
            create_ip_rate_limiter(config.login.attempts, config.login.window_seconds);

        let state = AppState {
            tenants: tenants.clone(),
            quota: Arc::new(QuotaTracker::new()),
            sessions: Arc::new(SessionStore::new()),
            drive,
            text_provider,
            config,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            tenant_count = tenants.len(),
            "portal service listening"
        );

        Ok(Self {
            port,
            listener,
            state,
            login_limiter,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        // Stale quota buckets accumulate one entry per tenant per bucket;
        // sweep them so memory stays bounded over the process lifetime.
        let quota = self.state.quota.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(QUOTA_SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                let evicted = quota.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "expired quota buckets dropped");
                }
            }
        });

        let router = build_router(self.state, self.login_limiter);

        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

/// Assemble the API surface. The session-creation route carries the
/// per-IP login throttle; everything else relies on session ids being
/// unguessable and the per-tenant quota.
fn build_router(state: AppState, login_limiter: IpRateLimiter) -> Router {
    let login_routes = Router::new()
        .route("/sessions", post(handlers::sessions::create_session))
        .route_layer(axum::middleware::from_fn_with_state(
            login_limiter,
            portal_core::middleware::rate_limit::ip_rate_limit_middleware,
        ));

    let session_routes = Router::new()
        .route(
            "/sessions/:id",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        .route(
            "/sessions/:id/settings",
            put(handlers::sessions::update_settings),
        )
        .route(
            "/sessions/:id/messages",
            post(handlers::sessions::post_message),
        );

    Router::new()
        .merge(login_routes)
        .merge(session_routes)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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

    tracing::info!("Shutdown signal received");
}
