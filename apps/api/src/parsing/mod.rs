// Résumé parsing: section segmentation, field extraction, heuristic and
// AI-assisted parsers. Both parser paths produce a `ParsedResumeRecord`.

pub mod ai;
pub mod entries;
pub mod fields;
pub mod heuristic;
pub mod models;
pub mod prompts;
pub mod sections;

pub use ai::{parse_resume, AiFailure};
pub use models::ParsedResumeRecord;
