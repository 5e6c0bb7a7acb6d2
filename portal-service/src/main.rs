use portal_core::observability::init_tracing;
use portal_service::config::PortalConfig;
use portal_service::services::metrics::init_metrics;
use portal_service::startup::Application;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_tracing("portal-service", "info");
    init_metrics();

    let config = PortalConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_until_stopped().await
}
