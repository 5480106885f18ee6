//! AI-assisted parser: one extraction call per upload, heuristic fallback on
//! any failure.

use serde::Serialize;
use tracing::{info, warn};

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, ChatMessage, ChatModel, LlmError};
use crate::parsing::entries::truncate_chars;
use crate::parsing::heuristic::parse_heuristic;
use crate::parsing::models::ParsedResumeRecord;
use crate::parsing::prompts::{RESUME_PARSE_PROMPT, RESUME_PARSE_SYSTEM};

/// Why the AI path did not produce the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AiFailure {
    Disabled,
    MissingCredentials { provider: String },
    Transport { message: String },
    MalformedReply { message: String },
}

impl std::fmt::Display for AiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiFailure::Disabled => write!(f, "LLM provider disabled"),
            AiFailure::MissingCredentials { provider } => {
                write!(f, "no credentials for provider {provider}")
            }
            AiFailure::Transport { message } => write!(f, "LLM call failed: {message}"),
            AiFailure::MalformedReply { message } => write!(f, "malformed LLM reply: {message}"),
        }
    }
}

impl From<LlmError> for AiFailure {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Disabled => AiFailure::Disabled,
            LlmError::MissingCredentials(provider) => AiFailure::MissingCredentials {
                provider: provider.to_string(),
            },
            LlmError::Parse(_) | LlmError::EmptyContent => AiFailure::MalformedReply {
                message: e.to_string(),
            },
            LlmError::Http(_) | LlmError::Api { .. } => AiFailure::Transport {
                message: e.to_string(),
            },
        }
    }
}

/// Result of parsing one upload. Both variants carry a usable record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    AiSucceeded(ParsedResumeRecord),
    AiFailed {
        reason: AiFailure,
        record: ParsedResumeRecord,
    },
}

impl ParseOutcome {
    pub fn into_record(self) -> ParsedResumeRecord {
        match self {
            ParseOutcome::AiSucceeded(record) => record,
            ParseOutcome::AiFailed { record, .. } => record,
        }
    }

    /// Which path produced the record: "ai" or "heuristic".
    pub fn parser(&self) -> &'static str {
        match self {
            ParseOutcome::AiSucceeded(_) => "ai",
            ParseOutcome::AiFailed { .. } => "heuristic",
        }
    }

    pub fn failure(&self) -> Option<&AiFailure> {
        match self {
            ParseOutcome::AiSucceeded(_) => None,
            ParseOutcome::AiFailed { reason, .. } => Some(reason),
        }
    }
}

pub fn build_extraction_prompt(text: &str, excerpt_chars: usize) -> Vec<ChatMessage> {
    let excerpt = truncate_chars(text, excerpt_chars);
    vec![
        ChatMessage::system(format!("{RESUME_PARSE_SYSTEM}\n{JSON_ONLY_SYSTEM}")),
        ChatMessage::user(RESUME_PARSE_PROMPT.replace("{resume_text}", &excerpt)),
    ]
}

/// Decodes a model reply into a record. The reply must be a single JSON
/// object, optionally wrapped in a code fence.
pub fn decode_reply(reply: &str) -> Result<ParsedResumeRecord, AiFailure> {
    let body = strip_json_fences(reply);
    serde_json::from_str::<ParsedResumeRecord>(body).map_err(|e| AiFailure::MalformedReply {
        message: e.to_string(),
    })
}

/// Runs the AI path only. No retries.
pub async fn parse_with_ai(
    text: &str,
    chat: &dyn ChatModel,
    excerpt_chars: usize,
) -> Result<ParsedResumeRecord, AiFailure> {
    let messages = build_extraction_prompt(text, excerpt_chars);
    let reply = chat.chat(&messages).await?;
    let mut record = decode_reply(&reply)?;
    record.raw_text = text.to_string();
    Ok(record.normalize())
}

/// Tries the language model first and falls back to the heuristic parser.
/// Never fails.
pub async fn parse_resume(text: &str, chat: &dyn ChatModel, excerpt_chars: usize) -> ParseOutcome {
    match parse_with_ai(text, chat, excerpt_chars).await {
        Ok(record) => {
            info!("Résumé parsed by LLM ({} skills)", record.skills.len());
            ParseOutcome::AiSucceeded(record)
        }
        Err(reason) => {
            warn!("LLM parsing failed ({reason}); falling back to heuristic parser");
            ParseOutcome::AiFailed {
                reason,
                record: parse_heuristic(text),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChat;

    const TEXT: &str = "Jane Doe\nSkills\nRust, SQL\n";

    #[tokio::test]
    async fn test_ai_success_verbatim() {
        let chat = ScriptedChat::reply(
            r#"```json
{"first_name": "Jane", "last_name": "Doe", "skills": ["Rust", "rust", "SQL"], "experience_years": 4,
 "experience": [{"title": "Engineer", "company": "Acme", "duration": "2020-2024", "description": ""}]}
```"#,
        );
        let outcome = parse_resume(TEXT, &chat, 4000).await;
        let ParseOutcome::AiSucceeded(record) = outcome else {
            panic!("expected the AI path to succeed");
        };
        assert_eq!(record.first_name, "Jane");
        assert_eq!(record.skills, vec!["Rust", "SQL"]);
        assert_eq!(record.experience_years, 4);
        assert_eq!(record.experience[0].company, "Acme");
        assert_eq!(record.raw_text, TEXT);
        assert_eq!(chat.calls(), 1);
    }

    #[tokio::test]
    async fn test_non_json_reply_falls_back() {
        let chat = ScriptedChat::reply("Sorry, I can't help with that.");
        let outcome = parse_resume(TEXT, &chat, 4000).await;
        assert_eq!(outcome.parser(), "heuristic");
        assert!(matches!(
            outcome.failure(),
            Some(AiFailure::MalformedReply { .. })
        ));
        assert_eq!(outcome.clone().into_record().first_name, "Jane");
        assert_eq!(chat.calls(), 1);
    }

    #[tokio::test]
    async fn test_json_array_reply_is_malformed() {
        let chat = ScriptedChat::reply("[1, 2, 3]");
        let outcome = parse_resume(TEXT, &chat, 4000).await;
        assert!(matches!(
            outcome.failure(),
            Some(AiFailure::MalformedReply { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_error_falls_back_without_retry() {
        let chat = ScriptedChat::error(|| LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        });
        let outcome = parse_resume(TEXT, &chat, 4000).await;
        assert!(matches!(outcome.failure(), Some(AiFailure::Transport { .. })));
        assert_eq!(chat.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_and_missing_credentials_fall_back() {
        let chat = ScriptedChat::error(|| LlmError::Disabled);
        let outcome = parse_resume(TEXT, &chat, 4000).await;
        assert_eq!(outcome.failure(), Some(&AiFailure::Disabled));

        let chat = ScriptedChat::error(|| LlmError::MissingCredentials("openai"));
        let outcome = parse_resume(TEXT, &chat, 4000).await;
        assert_eq!(
            outcome.failure(),
            Some(&AiFailure::MissingCredentials {
                provider: "openai".to_string()
            })
        );
        assert!(outcome.clone().into_record().skills.iter().any(|s| s == "Rust"));
    }

    #[test]
    fn test_prompt_excerpt_is_bounded() {
        let text = "é".repeat(10_000);
        let messages = build_extraction_prompt(&text, 4000);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, "user");
        let count = messages[1].content.matches('é').count();
        assert_eq!(count, 4000);
    }
}
