use anyhow::{Context, Result};
use parlay_pulse::confidence::ConfidenceScorer;
use parlay_pulse::config::Config;
use parlay_pulse::ocr::TesseractOcr;
use parlay_pulse::routes;
use parlay_pulse::store::JsonFileStore;
use parlay_pulse::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    let stats = config
        .stats_client()
        .context("NFL_API_KEY not set in .env file")?;

    info!(
        current_season = stats.current_season(),
        store = %config.store_path.display(),
        "Configured Parlay Pulse"
    );

    let state = AppState {
        scorer: Arc::new(ConfidenceScorer::new(Arc::new(stats)).with_policy(config.scoring.clone())),
        store: Arc::new(JsonFileStore::new(&config.store_path)),
        ocr: Arc::new(TesseractOcr::new().with_binary(&config.tesseract_bin)),
    };

    let cors = routes::cors_layer(&config.cors_origin).context("Failed to configure CORS")?;
    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("Starting Parlay Pulse API at http://{}", config.bind_addr);
    info!("Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
