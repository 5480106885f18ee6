use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::candidates::intake::{ingest_resume, IntakeReport, ResumeUpload};
use crate::errors::AppError;
use crate::models::resume::ResumeVersionRow;
use crate::state::AppState;

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::Validation(format!("Malformed multipart body: {e}"))
}

fn parse_flag(raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AppError::Validation(format!(
            "index must be true or false, got '{other}'"
        ))),
    }
}

/// POST /api/v1/resumes/upload
///
/// Multipart fields: `file`, `candidate_id`, optional `index`.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IntakeReport>, AppError> {
    let mut candidate_id: Option<Uuid> = None;
    let mut file: Option<(String, Bytes)> = None;
    let mut index = state.config.index_on_upload;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or("") {
            "candidate_id" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let id = Uuid::parse_str(raw.trim()).map_err(|_| {
                    AppError::Validation(format!("candidate_id '{raw}' is not a UUID"))
                })?;
                candidate_id = Some(id);
            }
            "index" => {
                let raw = field.text().await.map_err(multipart_error)?;
                index = parse_flag(&raw)?;
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, data));
            }
            _ => {
                field.bytes().await.map_err(multipart_error)?;
            }
        }
    }

    let candidate_id =
        candidate_id.ok_or_else(|| AppError::Validation("candidate_id is required".to_string()))?;
    let (file_name, data) =
        file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if data.is_empty() {
        return Err(AppError::Validation("file is empty".to_string()));
    }

    let report = ingest_resume(
        &state,
        ResumeUpload {
            candidate_id,
            file_name,
            data,
            index,
        },
    )
    .await?;
    Ok(Json(report))
}

/// GET /api/v1/candidates/:id/resumes
pub async fn handle_list_versions(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<Vec<ResumeVersionRow>>, AppError> {
    if state.repo.fetch_profile(candidate_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Candidate {candidate_id} not found"
        )));
    }
    let versions = state.repo.list_versions(candidate_id).await?;
    Ok(Json(versions))
}
