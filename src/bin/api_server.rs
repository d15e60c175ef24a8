// API Server Binary Entry Point
//
// Purpose: Start the Axum API server (crop classifier + price forecaster)
// Usage: cargo run --features api --bin api_server

use crop_advisor::{create_router, AppConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration: defaults < crop_advisor.toml < .env / environment
    let config = AppConfig::load()?;

    // Initialize tracing (structured logging)
    let default_filter = config.default_log_filter();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");
    tracing::info!("Configuration:");
    tracing::info!("  MODEL_DIR: {}", config.model_dir);
    tracing::info!("  CLASSIFIER_PATH: {}", config.classifier_path().display());
    tracing::info!("  PRICE_MODEL_PATH: {}", config.price_model_path().display());
    tracing::info!("  PRICE_DATA_PATH: {}", config.price_data_path().display());
    tracing::info!("  CORS_ORIGINS: {}", config.cors_origins);
    tracing::info!("  PORT: {}", config.port);

    let addr = format!("{}:{}", config.host, config.port);

    // Load models and price history (failures leave the endpoint unavailable)
    tracing::info!("Initializing application state...");
    let state = tokio::task::spawn_blocking(move || AppState::new(config)).await??;
    tracing::info!(
        "Application state initialized (classifier: {}, price service: {})",
        state.classifier.is_some(),
        state.forecaster.is_some()
    );

    // Create router with all endpoints and middleware
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
