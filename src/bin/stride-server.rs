// ABOUTME: Server binary wiring configuration, database, pipelines, and the HTTP router
// ABOUTME: Serves the operational surface until interrupted

//! Stride server entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use stride::config::ServerConfig;
use stride::database::Database;
use stride::llm::AnthropicProvider;
use stride::logging::LoggingConfig;
use stride::oauth::manager::TokenManager;
use stride::recommendations::RecommendationPipeline;
use stride::routes::{self, ServerResources};
use stride::sync::SyncOrchestrator;
use tracing::info;

/// Stride training analytics server
#[derive(Debug, Parser)]
#[command(name = "stride-server", version, about)]
struct Args {
    /// Override the HTTP listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    LoggingConfig::from_env()
        .init()
        .context("failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }

    let database = Arc::new(
        Database::new(&config.database_url)
            .await
            .context("failed to open database")?,
    );
    info!("Database ready at {}", config.database_url);

    let token_manager = Arc::new(TokenManager::new(
        Arc::clone(&database),
        config.strava_client_id.clone(),
        config.strava_client_secret.clone(),
        config.strava_redirect_uri.clone(),
    ));

    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&database),
        Arc::clone(&token_manager),
        config.sync_max_concurrency,
    ));

    let llm = Arc::new(AnthropicProvider::from_env().context("failed to configure LLM provider")?);
    let recommendations = Arc::new(RecommendationPipeline::new(Arc::clone(&database), llm));

    let resources = Arc::new(ServerResources {
        database,
        token_manager,
        orchestrator,
        recommendations,
        config: config.clone(),
    });

    let app = routes::router(resources);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Stride server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
