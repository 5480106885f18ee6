use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One stored upload. A candidate owns 0..=cap of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResumeVersionRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub file_path: String,
    pub file_name: String,
    pub parsed_text: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields of a version row before it is inserted.
#[derive(Debug, Clone)]
pub struct NewResumeVersion {
    pub candidate_id: Uuid,
    pub file_path: String,
    pub file_name: String,
    pub parsed_text: String,
    pub uploaded_at: DateTime<Utc>,
}
