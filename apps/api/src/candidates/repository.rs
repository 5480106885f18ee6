//! Record-store contract for candidate profiles and résumé versions.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::candidate::CandidateProfileRow;
use crate::models::resume::{NewResumeVersion, ResumeVersionRow};

/// The relational store as seen by the résumé pipeline.
///
/// Carried in `AppState` as `Arc<dyn CandidateRepository>`.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn fetch_profile(&self, candidate_id: Uuid) -> Result<Option<CandidateProfileRow>>;

    async fn update_profile(
        &self,
        candidate_id: Uuid,
        skills: &str,
        experience_years: u32,
    ) -> Result<()>;

    /// Live versions for a candidate, oldest first.
    async fn list_versions(&self, candidate_id: Uuid) -> Result<Vec<ResumeVersionRow>>;

    async fn insert_version(&self, version: NewResumeVersion) -> Result<ResumeVersionRow>;

    /// Returns `false` when no row had that id.
    async fn delete_version(&self, version_id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgCandidateRepository {
    pool: PgPool,
}

impl PgCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn fetch_profile(&self, candidate_id: Uuid) -> Result<Option<CandidateProfileRow>> {
        sqlx::query_as::<_, CandidateProfileRow>(
            "SELECT id, skills, experience_years FROM candidates WHERE id = $1",
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load candidate {candidate_id}"))
    }

    async fn update_profile(
        &self,
        candidate_id: Uuid,
        skills: &str,
        experience_years: u32,
    ) -> Result<()> {
        let years = i32::try_from(experience_years).unwrap_or(i32::MAX);
        sqlx::query("UPDATE candidates SET skills = $1, experience_years = $2 WHERE id = $3")
            .bind(skills)
            .bind(years)
            .bind(candidate_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update candidate {candidate_id}"))?;
        Ok(())
    }

    async fn list_versions(&self, candidate_id: Uuid) -> Result<Vec<ResumeVersionRow>> {
        sqlx::query_as::<_, ResumeVersionRow>(
            r#"
            SELECT id, candidate_id, file_path, file_name, parsed_text, uploaded_at
            FROM resume_versions
            WHERE candidate_id = $1
            ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list résumé versions for {candidate_id}"))
    }

    async fn insert_version(&self, version: NewResumeVersion) -> Result<ResumeVersionRow> {
        sqlx::query_as::<_, ResumeVersionRow>(
            r#"
            INSERT INTO resume_versions
                (id, candidate_id, file_path, file_name, parsed_text, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, candidate_id, file_path, file_name, parsed_text, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(version.candidate_id)
        .bind(&version.file_path)
        .bind(&version.file_name)
        .bind(&version.parsed_text)
        .bind(version.uploaded_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert résumé version")
    }

    async fn delete_version(&self, version_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resume_versions WHERE id = $1")
            .bind(version_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete résumé version {version_id}"))?;
        Ok(result.rows_affected() > 0)
    }
}
