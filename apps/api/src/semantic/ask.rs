//! Retrieval-augmented question answering over the semantic index.

use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::{ChatMessage, ChatModel};
use crate::parsing::entries::truncate_chars;
use crate::semantic::index::{IndexError, SearchHit, SemanticIndex};

const DOCUMENT_EXCERPT_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// `None` when the language model could not be reached.
    pub answer: Option<String>,
    pub sources: Vec<SearchHit>,
}

pub fn build_answer_prompt(question: &str, sources: &[SearchHit]) -> Vec<ChatMessage> {
    let context = sources
        .iter()
        .map(|hit| {
            format!(
                "[{}] ({})\n{}",
                hit.id,
                hit.source,
                truncate_chars(&hit.text, DOCUMENT_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    vec![
        ChatMessage::system(GROUNDING_INSTRUCTION),
        ChatMessage::user(format!("Documents:\n{context}\n\nQuestion: {question}")),
    ]
}

/// Retrieves the `k` nearest documents and asks the model to answer from
/// them. Index errors propagate; a model failure only drops the answer.
pub async fn answer_question(
    index: &SemanticIndex,
    chat: &dyn ChatModel,
    question: &str,
    k: usize,
) -> Result<RagAnswer, IndexError> {
    let sources = index.search(question, k).await?;
    if sources.is_empty() {
        return Ok(RagAnswer {
            answer: None,
            sources,
        });
    }

    let messages = build_answer_prompt(question, &sources);
    let answer = match chat.chat(&messages).await {
        Ok(text) => {
            info!("Answered question from {} documents", sources.len());
            Some(text.trim().to_string())
        }
        Err(e) => {
            warn!("Question answering unavailable: {e}");
            None
        }
    };

    Ok(RagAnswer { answer, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::semantic::embedder::HashingEmbedder;
    use crate::testing::ScriptedChat;
    use std::sync::Arc;

    async fn seeded_index(dir: &std::path::Path) -> SemanticIndex {
        let index = SemanticIndex::open(dir, Arc::new(HashingEmbedder::new(256))).unwrap();
        index
            .add("jd-1", "Senior Rust engineer for payments", "job")
            .await
            .unwrap();
        index
            .add("note-1", "Candidate prefers remote work", "note")
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_documents() {
        let dir = tempfile::tempdir().unwrap();
        let index = seeded_index(dir.path()).await;
        let chat = ScriptedChat::reply("  A Rust engineer. [jd-1]\n");

        let result = answer_question(&index, &chat, "Rust engineer role?", 1)
            .await
            .unwrap();
        assert_eq!(result.answer.as_deref(), Some("A Rust engineer. [jd-1]"));
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].id, "jd-1");
        assert_eq!(chat.calls(), 1);
        let prompt = chat.last_prompt();
        assert!(prompt[1].content.contains("[jd-1] (job)"));
        assert!(!prompt[1].content.contains("note-1"));
    }

    #[tokio::test]
    async fn test_model_failure_keeps_sources() {
        let dir = tempfile::tempdir().unwrap();
        let index = seeded_index(dir.path()).await;
        let chat = ScriptedChat::error(|| LlmError::Disabled);

        let result = answer_question(&index, &chat, "remote work", 2).await.unwrap();
        assert!(result.answer.is_none());
        assert_eq!(result.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_skips_model() {
        let dir = tempfile::tempdir().unwrap();
        let index = SemanticIndex::open(dir.path(), Arc::new(HashingEmbedder::new(256))).unwrap();
        let chat = ScriptedChat::reply("unused");
        let result = answer_question(&index, &chat, "anything", 3).await.unwrap();
        assert!(result.answer.is_none());
        assert_eq!(chat.calls(), 0);
    }

    #[test]
    fn test_prompt_lists_sources_by_id() {
        let hits = vec![SearchHit {
            id: "d1".to_string(),
            text: "machine learning".to_string(),
            source: "resume".to_string(),
            distance: 0.1,
        }];
        let messages = build_answer_prompt("Who knows ML?", &hits);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("[d1] (resume)\nmachine learning"));
        assert!(messages[1].content.ends_with("Question: Who knows ML?"));
    }
}
