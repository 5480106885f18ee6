// Candidate-facing half of résumé intake: profile merge, stored files,
// bounded version history and the upload pipeline tying them together.

pub mod handlers;
pub mod intake;
pub mod merge;
pub mod repository;
pub mod storage;
pub mod versions;

pub use repository::PgCandidateRepository;
