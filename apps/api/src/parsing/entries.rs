//! Line-oriented sub-record parsers for the education, experience and projects
//! zones. A non-empty zone never disappears: when no structure is detected the
//! zone text is wrapped in a single synthetic entry.

use std::sync::OnceLock;

use regex::Regex;

use crate::parsing::models::{EducationEntry, ExperienceEntry, ProjectEntry};

const DEGREE_KEYWORDS: &[&str] = &[
    "bachelor",
    "master",
    "b.tech",
    "m.tech",
    "phd",
    "diploma",
    "bsc",
    "msc",
    "bca",
    "mca",
    "university",
    "college",
    "institute",
    "school",
];

const EDUCATION_FALLBACK_CHARS: usize = 200;
const EXPERIENCE_FALLBACK_CHARS: usize = 500;
const PROJECTS_MAX_CHARS: usize = 500;

/// Title given to an experience entry opened by a bare date line; the next
/// plain line replaces it.
const PLACEHOLDER_ROLE: &str = "Role";

fn date_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s*\d{4})|(\d{4}\s*[-–]\s*(?:present|current|\d{4}))",
        )
        .expect("valid date range regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").expect("valid year regex"))
}

/// First `max` characters of `text`, respecting char boundaries.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn non_blank_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

pub fn parse_education(zone: &str) -> Vec<EducationEntry> {
    let mut entries = Vec::new();
    let mut current: Option<EducationEntry> = None;

    for line in non_blank_lines(zone) {
        let lower = line.to_lowercase();
        if DEGREE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            entries.extend(current.take());
            current = Some(EducationEntry {
                degree: line.to_string(),
                ..Default::default()
            });
        } else if let Some(entry) = current.as_mut() {
            if year_re().is_match(line) {
                entry.year = line.to_string();
            } else if entry.school.is_empty() {
                entry.school = line.to_string();
            }
        }
    }
    entries.extend(current);

    if entries.is_empty() && !zone.trim().is_empty() {
        return vec![EducationEntry {
            degree: "Education Details".to_string(),
            school: truncate_chars(zone, EDUCATION_FALLBACK_CHARS),
            year: String::new(),
        }];
    }
    entries
}

/// Handles `role | company | date` lines as well as entries opened by a line
/// that merely contains a date range.
pub fn parse_experience(zone: &str) -> Vec<ExperienceEntry> {
    let date_re = date_range_re();
    let mut entries = Vec::new();
    let mut current: Option<ExperienceEntry> = None;

    for line in non_blank_lines(zone) {
        if line.contains('|') {
            let parts: Vec<&str> = line.split('|').map(str::trim).collect();
            if let Some(date_part) = parts.iter().find(|p| date_re.is_match(p)) {
                entries.extend(current.take());
                current = Some(ExperienceEntry {
                    title: parts[0].to_string(),
                    company: parts.get(1).copied().unwrap_or_default().to_string(),
                    duration: date_part.to_string(),
                    description: String::new(),
                });
                continue;
            }
        }

        if let Some(m) = date_re.find(line) {
            entries.extend(current.take());
            current = Some(ExperienceEntry {
                title: PLACEHOLDER_ROLE.to_string(),
                company: line.to_string(),
                duration: m.as_str().to_string(),
                description: String::new(),
            });
        } else if let Some(entry) = current.as_mut() {
            if entry.title.is_empty() || entry.title == PLACEHOLDER_ROLE {
                entry.title = line.to_string();
            } else {
                entry.description.push_str(line);
                entry.description.push(' ');
            }
        }
    }
    entries.extend(current);

    for entry in &mut entries {
        let trimmed = entry.description.trim_end().len();
        entry.description.truncate(trimmed);
    }

    if entries.is_empty() && !zone.trim().is_empty() {
        return vec![ExperienceEntry {
            title: "Work Experience".to_string(),
            description: truncate_chars(zone, EXPERIENCE_FALLBACK_CHARS),
            ..Default::default()
        }];
    }
    entries
}

/// Projects are kept as one entry holding the (bounded) zone text.
pub fn parse_projects(zone: &str) -> Vec<ProjectEntry> {
    if zone.trim().is_empty() {
        return Vec::new();
    }
    vec![ProjectEntry {
        title: "Project Details".to_string(),
        description: truncate_chars(zone, PROJECTS_MAX_CHARS),
        link: String::new(),
    }]
}
