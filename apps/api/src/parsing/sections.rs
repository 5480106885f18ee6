//! Section segmenter: partitions raw résumé text into labeled zones.
//!
//! A line is a header when its trimmed, lower-cased form is shorter than
//! [`MAX_HEADER_CHARS`] and equals or contains one of the zone's trigger
//! phrases. Zones are checked in [`ZONE_TRIGGERS`] order; the first match wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const MAX_HEADER_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Education,
    Experience,
    Projects,
    Skills,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Education => "education",
            Zone::Experience => "experience",
            Zone::Projects => "projects",
            Zone::Skills => "skills",
        }
    }
}

/// Trigger phrases per zone, in tie-break order.
pub const ZONE_TRIGGERS: &[(Zone, &[&str])] = &[
    (
        Zone::Education,
        &["education", "academic", "qualifications", "education history"],
    ),
    (
        Zone::Experience,
        &[
            "experience",
            "work history",
            "employment",
            "professional experience",
            "work experience",
        ],
    ),
    (
        Zone::Projects,
        &["projects", "personal projects", "academic projects"],
    ),
    (
        Zone::Skills,
        &[
            "skills",
            "core skills",
            "technical skills",
            "technologies",
            "competencies",
        ],
    ),
];

/// Zone name → concatenated zone text (each kept line followed by `\n`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    zones: HashMap<Zone, String>,
}

impl Sections {
    /// Text of a zone, empty when the zone never appeared.
    pub fn get(&self, zone: Zone) -> &str {
        self.zones.get(&zone).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.zones.values().all(|text| text.is_empty())
    }
}

/// Returns the zone a header line opens, or `None` for body lines.
pub fn classify_header(line: &str) -> Option<Zone> {
    let clean = line.trim().to_lowercase();
    if clean.chars().count() >= MAX_HEADER_CHARS {
        return None;
    }
    ZONE_TRIGGERS
        .iter()
        .find(|(_, triggers)| {
            triggers
                .iter()
                .any(|t| clean == *t || clean.contains(t))
        })
        .map(|(zone, _)| *zone)
}

/// Splits `text` into zones. Header lines are dropped, as is anything before
/// the first header.
pub fn segment(text: &str) -> Sections {
    let mut sections = Sections::default();
    let mut current: Option<Zone> = None;

    for line in text.lines() {
        if let Some(zone) = classify_header(line) {
            current = Some(zone);
            continue;
        }
        if let Some(zone) = current {
            let body = sections.zones.entry(zone).or_default();
            body.push_str(line);
            body.push('\n');
        }
    }

    sections
}
