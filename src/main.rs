use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;

use product_scraper::api::{self, AppState};
use product_scraper::browser::ChromeEngine;
use product_scraper::config::Config;
use product_scraper::logging;
use product_scraper::orchestrator::ScrapeOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init();

    let config = Config::from_env()?;
    let engine = Arc::new(ChromeEngine::new(config.launch_config()));
    let state = Arc::new(AppState {
        orchestrator: ScrapeOrchestrator::new(engine),
    });

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!("🚀 Servidor rodando em http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
