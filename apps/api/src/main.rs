mod commitments;
mod config;
mod dashboard;
mod db;
mod errors;
mod extract;
mod llm_client;
mod models;
mod notifications;
mod pods;
mod routes;
mod scoreboard;
mod state;
#[cfg(all(test, feature = "live-db-tests"))]
mod test_support;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::notifications::composer::{LlmComposer, MessageComposer, TemplateComposer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first; a missing DATABASE_URL stops startup here
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Progress Method API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    let composer: Arc<dyn MessageComposer> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("Notification composer: LLM (model: {})", llm_client::MODEL);
            Arc::new(LlmComposer::new(llm))
        }
        None => {
            info!("Notification composer: template (ANTHROPIC_API_KEY not set)");
            Arc::new(TemplateComposer)
        }
    };

    info!(
        "Pod health window: {} weeks, intervention below {}",
        config.health.window_weeks, config.health.intervention_threshold
    );

    let state = AppState {
        db,
        config: config.clone(),
        composer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web admin has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
