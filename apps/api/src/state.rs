use std::sync::Arc;

use crate::config::Config;
use crate::evaluation::BatchEvaluator;
use crate::extraction::Extractor;
use crate::scoring::SimilarityScorer;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub extractor: Arc<dyn Extractor>,
    /// Model handle shared by every request; initialized on first use.
    pub scorer: Arc<dyn SimilarityScorer>,
    pub evaluator: Arc<BatchEvaluator>,
}
