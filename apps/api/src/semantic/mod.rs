// Semantic index over résumés and arbitrary documents, plus retrieval-augmented
// question answering on top of it.

pub mod ask;
pub mod embedder;
pub mod handlers;
pub mod index;

pub use embedder::build_embedder;
pub use index::{IndexError, SemanticIndex};
