//! Heuristic parser: deterministic, no external calls.
//!
//! Flow: segment → name/contact/years → skills → zone entries.

use tracing::debug;

use crate::parsing::entries::{parse_education, parse_experience, parse_projects, truncate_chars};
use crate::parsing::fields::{
    extract_email, extract_experience_years, extract_phone, extract_skills, guess_name,
};
use crate::parsing::models::ParsedResumeRecord;
use crate::parsing::sections::{segment, Zone, ZONE_TRIGGERS};

const SUMMARY_CHARS: usize = 500;

pub fn parse_heuristic(text: &str) -> ParsedResumeRecord {
    let sections = segment(text);
    if sections.is_empty() {
        debug!("No section headers found; zone entries will be empty");
    } else {
        let found: Vec<&str> = ZONE_TRIGGERS
            .iter()
            .map(|(zone, _)| *zone)
            .filter(|zone| !sections.get(*zone).is_empty())
            .map(|zone| zone.as_str())
            .collect();
        debug!("Résumé sections found: {}", found.join(", "));
    }
    let name = guess_name(text);

    let headline = format!("{} {} - Resume", name.first_name, name.last_name);
    let summary = format!("{}...", truncate_chars(text, SUMMARY_CHARS));

    ParsedResumeRecord {
        email: extract_email(text).unwrap_or_default(),
        phone: extract_phone(text).unwrap_or_default(),
        linkedin_url: None,
        portfolio_url: None,
        headline,
        summary,
        skills: extract_skills(text, sections.get(Zone::Skills)),
        experience_years: extract_experience_years(text),
        education: parse_education(sections.get(Zone::Education)),
        experience: parse_experience(sections.get(Zone::Experience)),
        projects: parse_projects(sections.get(Zone::Projects)),
        languages: Vec::new(),
        raw_text: text.to_string(),
        first_name: name.first_name,
        last_name: name.last_name,
    }
}
