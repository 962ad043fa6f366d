mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use coach_core::{CoachConfig, GptClient, Orchestrator};
use coach_provider_google::GoogleCalendar;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CoachConfig::load()?;
    let generator = GptClient::from_config(&config)?;
    let calendar = GoogleCalendar::connect()?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let orchestrator = Orchestrator::new(Arc::new(generator), Arc::new(calendar), config);
    let app = routes::app(AppState::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("coach-server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
