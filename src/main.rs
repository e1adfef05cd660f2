use scentinel::api::{create_router, AppState};
use scentinel::config::{Config, EngineSettings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scentinel=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let settings = EngineSettings::from_env()?;
    tracing::info!(
        neglect_threshold_days = settings.neglect_threshold_days,
        default_metric = %settings.default_metric,
        "Engine settings loaded"
    );

    // Initialize application state
    let state = AppState::with_settings(settings);

    // Create the router with all routes
    let app = create_router(state);

    // Start the server
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
