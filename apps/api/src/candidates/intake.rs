//! Résumé intake: one upload end to end.
//!
//! store file → extract text → parse (AI, heuristic fallback) → merge into
//! the candidate profile → record version (with retention) → index.

use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::merge::{merge_profile, MergedProfile};
use crate::candidates::storage::save_upload;
use crate::candidates::versions::record_upload;
use crate::errors::AppError;
use crate::extraction::{extract_text, DocumentFormat};
use crate::models::resume::ResumeVersionRow;
use crate::parsing::{parse_resume, AiFailure, ParsedResumeRecord};
use crate::state::AppState;

pub const RESUME_SOURCE: &str = "resume";

#[derive(Debug)]
pub struct ResumeUpload {
    pub candidate_id: Uuid,
    pub file_name: String,
    pub data: Bytes,
    /// Add the extracted text to the semantic index.
    pub index: bool,
}

#[derive(Debug, Serialize)]
pub struct IntakeReport {
    pub candidate_id: Uuid,
    /// "ai" or "heuristic".
    pub parser: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_failure: Option<AiFailure>,
    pub record: ParsedResumeRecord,
    pub profile: MergedProfile,
    pub version: ResumeVersionRow,
    pub evicted: Vec<Uuid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub eviction_failures: Vec<Uuid>,
    pub indexed: bool,
}

pub async fn ingest_resume(state: &AppState, upload: ResumeUpload) -> Result<IntakeReport, AppError> {
    let candidate_id = upload.candidate_id;
    let profile = state
        .repo
        .fetch_profile(candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

    let path = save_upload(
        &state.config.storage_root,
        candidate_id,
        &upload.file_name,
        &upload.data,
    )
    .await?;

    let format = DocumentFormat::from_path(Path::new(&upload.file_name));
    let text = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || extract_text(&path, format))
            .await
            .map_err(|e| anyhow::anyhow!("Text extraction task failed: {e}"))?
            // Postgres TEXT rejects NUL.
            .replace('\0', "")
    };

    let outcome = parse_resume(&text, state.chat.as_ref(), state.config.ai_excerpt_chars).await;
    let parser = outcome.parser();
    let ai_failure = outcome.failure().cloned();
    let record = outcome.into_record();

    let existing_years = profile.experience_years.unwrap_or(0).max(0) as u32;
    let merged = merge_profile(
        profile.skills.as_deref().unwrap_or(""),
        existing_years,
        &record,
    );
    state
        .repo
        .update_profile(candidate_id, &merged.skills, merged.experience_years)
        .await?;

    let retention = record_upload(
        state.repo.as_ref(),
        &state.version_locks,
        state.config.resume_version_cap,
        candidate_id,
        &path,
        &upload.file_name,
        &text,
    )
    .await?;

    let indexed = if upload.index {
        let id = retention.version.id.to_string();
        match state.index.add(&id, &text, RESUME_SOURCE).await {
            Ok(added) => added,
            Err(e) => {
                warn!("Résumé {id} was stored but not indexed: {e}");
                false
            }
        }
    } else {
        false
    };

    info!(
        "Ingested résumé for candidate {candidate_id}: parser={parser}, skills={}, indexed={indexed}",
        record.skills.len()
    );

    Ok(IntakeReport {
        candidate_id,
        parser,
        ai_failure,
        record,
        profile: merged,
        version: retention.version,
        evicted: retention.evicted,
        eviction_failures: retention.failed,
        indexed,
    })
}
