use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::semantic::ask::{answer_question, RagAnswer};
use crate::semantic::index::{IndexedDocument, SearchHit};
use crate::state::AppState;

const DEFAULT_K: usize = 3;
const MAX_K: usize = 50;

fn default_k() -> usize {
    DEFAULT_K
}

fn validate_k(k: usize) -> Result<usize, AppError> {
    if k > MAX_K {
        return Err(AppError::Validation(format!("k must be at most {MAX_K}")));
    }
    Ok(k)
}

#[derive(Deserialize)]
pub struct AddDocumentRequest {
    pub id: String,
    pub text: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    "document".to_string()
}

#[derive(Serialize)]
pub struct AddDocumentResponse {
    pub id: String,
    pub indexed: bool,
}

/// POST /api/v1/index/documents
pub async fn handle_add_document(
    State(state): State<AppState>,
    Json(req): Json<AddDocumentRequest>,
) -> Result<Json<AddDocumentResponse>, AppError> {
    if req.id.trim().is_empty() {
        return Err(AppError::Validation("id must not be empty".to_string()));
    }
    let indexed = state.index.add(&req.id, &req.text, &req.source).await?;
    Ok(Json(AddDocumentResponse {
        id: req.id,
        indexed,
    }))
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

/// POST /api/v1/index/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let k = validate_k(req.k)?;
    let results = state.index.search(&req.query, k).await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Deserialize)]
pub struct RebuildRequest {
    pub documents: Vec<IndexedDocument>,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub documents: usize,
}

/// POST /api/v1/index/rebuild
///
/// With an empty body the index is rebuilt from the documents it still holds
/// (or salvaged, when the store was corrupted). A malformed body is a 400.
pub async fn handle_rebuild(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RebuildResponse>, AppError> {
    let documents = if body.iter().all(u8::is_ascii_whitespace) {
        state.index.salvage()
    } else {
        serde_json::from_slice::<RebuildRequest>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid rebuild request: {e}")))?
            .documents
    };
    let documents = state.index.rebuild(documents).await?;
    Ok(Json(RebuildResponse { documents }))
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

/// POST /api/v1/rag/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<RagAnswer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("question must not be empty".to_string()));
    }
    let k = validate_k(req.k)?;
    let answer = answer_question(&state.index, state.chat.as_ref(), &req.question, k).await?;
    Ok(Json(answer))
}
