use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The slice of a candidate row that résumé merging reads and writes.
/// `skills` is a comma-joined list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CandidateProfileRow {
    pub id: Uuid,
    pub skills: Option<String>,
    pub experience_years: Option<i32>,
}
