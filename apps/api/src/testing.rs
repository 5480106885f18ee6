//! In-process stand-ins for the external collaborators, used by unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::candidates::repository::CandidateRepository;
use crate::candidates::versions::CandidateLocks;
use crate::config::Config;
use crate::llm_client::{ChatMessage, ChatModel, LlmError};
use crate::models::candidate::CandidateProfileRow;
use crate::models::resume::{NewResumeVersion, ResumeVersionRow};
use crate::semantic::embedder::{EmbedError, Embedder, HashingEmbedder};
use crate::semantic::SemanticIndex;
use crate::state::AppState;

pub const TEST_DIM: usize = 64;

/// Config rooted in `dir`, with offline collaborators.
pub fn test_config(dir: &Path) -> Config {
    let storage = dir.join("uploads").to_string_lossy().into_owned();
    let vectors = dir.join("vector_store").to_string_lossy().into_owned();
    Config::from_lookup(|key| {
        let value = match key {
            "DATABASE_URL" => "postgres://localhost/test",
            "STORAGE_ROOT" => storage.as_str(),
            "VECTOR_STORE_PATH" => vectors.as_str(),
            "LLM_PROVIDER" => "disabled",
            "EMBEDDING_PROVIDER" => "hashing",
            "EMBEDDING_DIM" => "64",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config is valid")
}

/// Application state over the given collaborators, a hashing embedder and
/// storage under `dir`.
pub fn test_state(
    dir: &Path,
    repo: Arc<dyn CandidateRepository>,
    chat: Arc<dyn ChatModel>,
) -> AppState {
    let config = test_config(dir);
    let index = SemanticIndex::open(
        config.vector_store_path.clone(),
        Arc::new(HashingEmbedder::new(TEST_DIM)),
    )
    .expect("index directory is writable");
    AppState {
        repo,
        chat,
        index: Arc::new(index),
        version_locks: Arc::new(CandidateLocks::new()),
        config,
    }
}

// ── chat ────────────────────────────────────────────────────────────────────

enum Script {
    Reply(String),
    Error(fn() -> LlmError),
}

/// A `ChatModel` that answers every call the same way and counts calls.
pub struct ScriptedChat {
    script: Script,
    calls: AtomicUsize,
    last_prompt: Mutex<Vec<ChatMessage>>,
}

impl ScriptedChat {
    pub fn reply(text: &str) -> Self {
        Self::with(Script::Reply(text.to_string()))
    }

    pub fn error(make: fn() -> LlmError) -> Self {
        Self::with(Script::Error(make))
    }

    fn with(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Vec<ChatMessage> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock() = messages.to_vec();
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Error(make) => Err(make()),
        }
    }
}

// ── embedding ───────────────────────────────────────────────────────────────

/// An `Embedder` whose every call fails as if the backend were down.
pub struct FailingEmbedder {
    dim: usize,
}

impl FailingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Api {
            status: 503,
            message: "embedding backend unavailable".to_string(),
        })
    }
}

// ── record store ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    candidates: Vec<CandidateProfileRow>,
    versions: Vec<ResumeVersionRow>,
}

/// A `CandidateRepository` held in memory. `fail_deletes` makes every
/// version delete error, for exercising the retention failure path.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: Mutex<Tables>,
    fail_deletes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candidate(&self, skills: &str, experience_years: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().candidates.push(CandidateProfileRow {
            id,
            skills: (!skills.is_empty()).then(|| skills.to_string()),
            experience_years: Some(experience_years),
        });
        id
    }

    pub fn profile(&self, candidate_id: Uuid) -> Option<CandidateProfileRow> {
        self.tables
            .lock()
            .candidates
            .iter()
            .find(|c| c.id == candidate_id)
            .cloned()
    }

    /// Oldest first, as `list_versions` returns them.
    pub fn versions(&self, candidate_id: Uuid) -> Vec<ResumeVersionRow> {
        let mut rows: Vec<ResumeVersionRow> = self
            .tables
            .lock()
            .versions
            .iter()
            .filter(|v| v.candidate_id == candidate_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        rows
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CandidateRepository for InMemoryRepository {
    async fn fetch_profile(&self, candidate_id: Uuid) -> Result<Option<CandidateProfileRow>> {
        Ok(self.profile(candidate_id))
    }

    async fn update_profile(
        &self,
        candidate_id: Uuid,
        skills: &str,
        experience_years: u32,
    ) -> Result<()> {
        let mut tables = self.tables.lock();
        let Some(row) = tables.candidates.iter_mut().find(|c| c.id == candidate_id) else {
            bail!("candidate {candidate_id} does not exist");
        };
        row.skills = Some(skills.to_string());
        row.experience_years = Some(experience_years as i32);
        Ok(())
    }

    async fn list_versions(&self, candidate_id: Uuid) -> Result<Vec<ResumeVersionRow>> {
        Ok(self.versions(candidate_id))
    }

    async fn insert_version(&self, version: NewResumeVersion) -> Result<ResumeVersionRow> {
        let row = ResumeVersionRow {
            id: Uuid::new_v4(),
            candidate_id: version.candidate_id,
            file_path: version.file_path,
            file_name: version.file_name,
            parsed_text: version.parsed_text,
            uploaded_at: version.uploaded_at,
        };
        self.tables.lock().versions.push(row.clone());
        Ok(row)
    }

    async fn delete_version(&self, version_id: Uuid) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("connection reset while deleting {version_id}");
        }
        let mut tables = self.tables.lock();
        let before = tables.versions.len();
        tables.versions.retain(|v| v.id != version_id);
        Ok(tables.versions.len() < before)
    }
}
