//! Record merger: folds a newly parsed résumé into a stored profile.

use serde::Serialize;

use crate::parsing::models::{dedup_case_insensitive, ParsedResumeRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedProfile {
    /// Comma-joined, order of first appearance, unique ignoring case.
    pub skills: String,
    pub experience_years: u32,
}

pub fn split_skills(skills: &str) -> impl Iterator<Item = String> + '_ {
    skills
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// `skills = existing ∪ new`, `experience_years = max(existing, new)`.
///
/// Existing skills keep their position; new ones are appended in record
/// order, so re-merging the same record is a no-op.
pub fn merge_profile(
    existing_skills: &str,
    existing_years: u32,
    record: &ParsedResumeRecord,
) -> MergedProfile {
    let merged = dedup_case_insensitive(
        split_skills(existing_skills).chain(record.skills.iter().cloned()),
    );
    MergedProfile {
        skills: merged.join(", "),
        experience_years: existing_years.max(record.experience_years),
    }
}
