mod candidates;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod parsing;
mod routes;
mod semantic;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::candidates::versions::CandidateLocks;
use crate::candidates::PgCandidateRepository;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::semantic::{build_embedder, SemanticIndex};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting résumé intake API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let repo = Arc::new(PgCandidateRepository::new(db));

    // Initialize LLM client
    let llm = LlmClient::new(config.llm.clone())?;
    info!("LLM client initialized (provider: {:?})", llm.provider());

    // Initialize semantic index
    let embedder = build_embedder(&config.embedding)?;
    let index = SemanticIndex::open(config.vector_store_path.clone(), embedder)?;
    if index.is_corrupted() {
        if config.rebuild_index_on_start {
            let salvage = index.salvage();
            info!("Rebuilding semantic index from {} salvaged documents", salvage.len());
            if let Err(e) = index.rebuild(salvage).await {
                warn!("Semantic index rebuild failed; search stays unavailable: {e}");
            }
        } else {
            warn!("Semantic index is corrupted; POST /api/v1/index/rebuild to repair it");
        }
    }

    tokio::fs::create_dir_all(&config.storage_root).await?;

    // Build app state
    let state = AppState {
        repo,
        chat: Arc::new(llm),
        index: Arc::new(index),
        version_locks: Arc::new(CandidateLocks::new()),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
