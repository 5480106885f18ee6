use std::sync::Arc;

use crate::candidates::repository::CandidateRepository;
use crate::candidates::versions::CandidateLocks;
use crate::config::Config;
use crate::llm_client::ChatModel;
use crate::semantic::SemanticIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Candidate profiles and résumé versions. Default: `PgCandidateRepository`.
    pub repo: Arc<dyn CandidateRepository>,
    /// Language model used by the AI-assisted parser and `/rag/ask`.
    pub chat: Arc<dyn ChatModel>,
    pub index: Arc<SemanticIndex>,
    /// Serialises résumé version retention per candidate.
    pub version_locks: Arc<CandidateLocks>,
    pub config: Config,
}
