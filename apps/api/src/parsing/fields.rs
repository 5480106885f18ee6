//! Format-agnostic field extractors used by the heuristic parser.

use std::sync::OnceLock;

use regex::Regex;

use crate::parsing::models::dedup_case_insensitive;

/// Lower-cased lines that can never be a person's name.
const NAME_STOP_WORDS: &[&str] = &[
    "resume",
    "curriculum",
    "vitae",
    "cv",
    "profile",
    "summary",
    "education",
    "experience",
    "skills",
    "projects",
    "contact",
];

const NAME_SCAN_LINES: usize = 10;
const NAME_MAX_TOKENS: usize = 5;

/// Matched as case-insensitive substrings of the whole text.
pub const COMMON_SKILLS: &[&str] = &[
    "python",
    "java",
    "javascript",
    "react",
    "node",
    "sql",
    "aws",
    "docker",
    "kubernetes",
    "c++",
    "c#",
    "go",
    "rust",
    "typescript",
    "html",
    "css",
    "machine learning",
    "ai",
    "data science",
    "git",
    "linux",
    "agile",
    "predictive modeling",
    "classification",
    "clustering",
    "tableau",
    "power bi",
];

const SKILL_DELIMITERS: &[char] = &[',', '|', '•', '\n'];

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(\+\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}|(\+\d{1,3}[\s.-]?)?\d{5}[\s.-]?\d{5}",
        )
        .expect("valid phone regex")
    })
}

fn years_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\+?\s*years?").expect("valid years regex"))
}

pub fn extract_email(text: &str) -> Option<String> {
    email_re().find(text).map(|m| m.as_str().to_string())
}

/// Covers `555-555-5555`, `(555) 555 5555`, `97696 86972` and a leading
/// country code on either shape.
pub fn extract_phone(text: &str) -> Option<String> {
    phone_re().find(text).map(|m| m.as_str().to_string())
}

/// First integer followed by "year"/"years" (an optional `+` in between);
/// 0 when nothing matches.
pub fn extract_experience_years(text: &str) -> u32 {
    years_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameGuess {
    pub first_name: String,
    pub last_name: String,
}

fn is_likely_name(line: &str) -> bool {
    line.split(' ').count() <= NAME_MAX_TOKENS
        && !line.contains('@')
        && !line.chars().any(|c| c.is_ascii_digit())
        && !NAME_STOP_WORDS.contains(&line.to_lowercase().as_str())
}

/// Picks the first plausible name among the first non-empty lines.
pub fn guess_name(text: &str) -> NameGuess {
    let candidate = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(NAME_SCAN_LINES)
        .find(|l| is_likely_name(l));

    let Some(line) = candidate else {
        return NameGuess::default();
    };

    let mut tokens = line.split(' ');
    let first_name = tokens.next().unwrap_or_default().to_string();
    let last_name = tokens.collect::<Vec<_>>().join(" ");
    NameGuess {
        first_name,
        last_name,
    }
}

/// Union of the delimited tokens in the skills zone (3–29 chars each) and
/// every [`COMMON_SKILLS`] entry found anywhere in the text.
pub fn extract_skills(full_text: &str, skills_zone: &str) -> Vec<String> {
    let from_zone = skills_zone
        .split(SKILL_DELIMITERS)
        .map(str::trim)
        .filter(|s| (3..30).contains(&s.chars().count()))
        .map(String::from);

    let lower = full_text.to_lowercase();
    let from_vocabulary = COMMON_SKILLS
        .iter()
        .filter(|skill| lower.contains(*skill))
        .map(|skill| skill.to_string());

    dedup_case_insensitive(from_zone.chain(from_vocabulary))
}
