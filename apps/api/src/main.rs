mod config;
mod db;
mod errors;
mod evaluation;
mod extraction;
mod llm_client;
mod models;
mod routes;
mod scoring;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, SimilarityBackend};
use crate::db::create_pool;
use crate::evaluation::{BatchEvaluator, PdfTextReader};
use crate::extraction::{Extractor, GeminiExtractor};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::similarity::{EmbeddingScorer, LexicalScorer};
use crate::scoring::SimilarityScorer;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS API v{}", env!("CARGO_PKG_VERSION"));

    // Persistence
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    // Gemini
    let llm = LlmClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.ai_timeout,
    )?;
    if llm.is_configured() {
        info!("LLM client initialized (model: {})", llm.model());
    } else {
        warn!("GEMINI_API_KEY is not set; extraction requests will fail");
    }

    let scorer: Arc<dyn SimilarityScorer> = match config.similarity_backend {
        SimilarityBackend::Embedding => Arc::new(EmbeddingScorer::new(
            llm.clone(),
            config.gemini_embedding_model.clone(),
        )),
        SimilarityBackend::Lexical => Arc::new(LexicalScorer),
    };
    info!("Similarity backend: {:?}", config.similarity_backend);

    let extractor: Arc<dyn Extractor> = Arc::new(GeminiExtractor::new(llm));

    let evaluator = Arc::new(BatchEvaluator::new(
        extractor.clone(),
        scorer.clone(),
        Arc::new(PdfTextReader),
        store.clone(),
        config.upload_limits(),
    ));

    let state = AppState {
        config: config.clone(),
        store,
        extractor,
        scorer,
        evaluator,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
