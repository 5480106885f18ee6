//! Version store: bounded résumé history per candidate.
//!
//! On each upload the candidate's versions are listed oldest first. Under the
//! cap the new row is simply inserted; at or over the cap the oldest
//! `count - (cap - 1)` versions are evicted first. Eviction deletes the
//! metadata row and then the file, so a crash in between leaves at worst an
//! orphaned file, never a row pointing at nothing.
//!
//! The list/evict/insert sequence for one candidate runs under that
//! candidate's lock, so concurrent uploads never overshoot the cap.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, info};
use uuid::Uuid;

use crate::candidates::repository::CandidateRepository;
use crate::candidates::storage::{remove_file, RemoveOutcome};
use crate::models::resume::{NewResumeVersion, ResumeVersionRow};

pub const DEFAULT_VERSION_CAP: usize = 3;

/// Per-candidate async locks. Idle entries are pruned on the next lookup.
#[derive(Default)]
pub struct CandidateLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl CandidateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, candidate_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            // Held or awaited locks have a second reference.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(candidate_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// What happened to the candidate's history during one upload.
#[derive(Debug, Clone, Serialize)]
pub struct RetentionReport {
    pub version: ResumeVersionRow,
    /// Versions whose rows were deleted.
    pub evicted: Vec<Uuid>,
    /// Versions that should have been evicted but whose row delete failed.
    pub failed: Vec<Uuid>,
}

/// Number of versions to evict before inserting one more.
pub fn surplus(count: usize, cap: usize) -> usize {
    let cap = cap.max(1);
    if count >= cap {
        count - (cap - 1)
    } else {
        0
    }
}

/// Upload timestamps are strictly increasing per candidate so that
/// "oldest" is unambiguous even for uploads within the same clock tick.
pub fn next_upload_timestamp(
    now: DateTime<Utc>,
    newest: Option<&ResumeVersionRow>,
) -> DateTime<Utc> {
    match newest {
        Some(last) if last.uploaded_at >= now => last.uploaded_at + Duration::milliseconds(1),
        _ => now,
    }
}

/// Applies the retention policy and inserts the new version.
///
/// Only the insert can fail the call. A failed row delete skips that
/// version's file and the insert still happens; file errors are logged.
pub async fn record_upload(
    repo: &dyn CandidateRepository,
    locks: &CandidateLocks,
    cap: usize,
    candidate_id: Uuid,
    file_path: &Path,
    file_name: &str,
    parsed_text: &str,
) -> Result<RetentionReport> {
    let _guard = locks.lock(candidate_id).await;
    let existing = repo.list_versions(candidate_id).await?;
    let to_evict = surplus(existing.len(), cap);
    let uploaded_at = next_upload_timestamp(Utc::now(), existing.last());

    let mut evicted = Vec::with_capacity(to_evict);
    let mut failed = Vec::new();

    for old in existing.iter().take(to_evict) {
        match repo.delete_version(old.id).await {
            Ok(_) => {
                if remove_file(Path::new(&old.file_path)).await == RemoveOutcome::Removed {
                    info!("Evicted résumé version {} ({})", old.id, old.file_name);
                }
                evicted.push(old.id);
            }
            Err(e) => {
                error!(
                    "Failed to delete résumé version {} for candidate {candidate_id}: {e:#}",
                    old.id
                );
                failed.push(old.id);
            }
        }
    }

    let version = repo
        .insert_version(NewResumeVersion {
            candidate_id,
            file_path: file_path.to_string_lossy().into_owned(),
            file_name: file_name.to_string(),
            parsed_text: parsed_text.to_string(),
            uploaded_at,
        })
        .await?;

    info!(
        "Stored résumé version {} for candidate {candidate_id} ({} evicted)",
        version.id,
        evicted.len()
    );

    Ok(RetentionReport {
        version,
        evicted,
        failed,
    })
}
