use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::candidates::versions::DEFAULT_VERSION_CAP;

/// Which chat backend the AI-assisted parser and `/rag/ask` talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
    Ollama,
    Disabled,
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            "ollama" | "local_llama" => Ok(LlmProvider::Ollama),
            "disabled" | "none" | "" => Ok(LlmProvider::Disabled),
            other => bail!("Unknown LLM_PROVIDER '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    Ollama,
    /// Deterministic token hashing; no model required.
    Hashing,
}

impl FromStr for EmbeddingProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbeddingProvider::Ollama),
            "hashing" | "fake" => Ok(EmbeddingProvider::Hashing),
            other => bail!("Unknown EMBEDDING_PROVIDER '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub dim: usize,
    pub timeout_secs: u64,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Uploaded files are written under `<storage_root>/resumes/<candidate_id>/`.
    pub storage_root: PathBuf,
    pub resume_version_cap: usize,
    pub vector_store_path: PathBuf,
    pub index_on_upload: bool,
    pub rebuild_index_on_start: bool,
    /// Upper bound on the résumé excerpt embedded in the extraction prompt.
    pub ai_excerpt_chars: usize,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process environment
    /// in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let resume_version_cap: usize = env.parse_or("RESUME_VERSION_CAP", DEFAULT_VERSION_CAP)?;
        if resume_version_cap == 0 {
            bail!("RESUME_VERSION_CAP must be at least 1");
        }
        let embedding_dim: usize = env.parse_or("EMBEDDING_DIM", 384)?;
        if embedding_dim == 0 {
            bail!("EMBEDDING_DIM must be at least 1");
        }

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            port: env.parse_or("PORT", 8080)?,
            rust_log: env.or("RUST_LOG", "info"),
            storage_root: PathBuf::from(env.or("STORAGE_ROOT", "uploads")),
            resume_version_cap,
            vector_store_path: PathBuf::from(env.or("VECTOR_STORE_PATH", "vector_store")),
            index_on_upload: env.parse_or("INDEX_ON_UPLOAD", true)?,
            rebuild_index_on_start: env.parse_or("REBUILD_INDEX_ON_START", true)?,
            ai_excerpt_chars: env.parse_or("AI_EXCERPT_CHARS", 4000)?,
            llm: LlmConfig {
                provider: env.parse_or("LLM_PROVIDER", LlmProvider::Anthropic)?,
                anthropic_api_key: env.optional("ANTHROPIC_API_KEY"),
                openai_api_key: env.optional("OPENAI_API_KEY"),
                ollama_base_url: env.or("OLLAMA_BASE_URL", "http://localhost:11434"),
                ollama_model: env.or("OLLAMA_MODEL", "llama3"),
                timeout_secs: env.parse_or("LLM_TIMEOUT_SECS", 60)?,
            },
            embedding: EmbeddingConfig {
                provider: env.parse_or("EMBEDDING_PROVIDER", EmbeddingProvider::Ollama)?,
                base_url: env.or("EMBEDDING_BASE_URL", "http://localhost:11434"),
                model: env.or("EMBEDDING_MODEL", "all-minilm"),
                dim: embedding_dim,
                timeout_secs: env.parse_or("EMBEDDING_TIMEOUT_SECS", 60)?,
            },
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.optional(key)
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/ats")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.resume_version_cap, 3);
        assert_eq!(config.ai_excerpt_chars, 4000);
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
        assert_eq!(config.embedding.dim, 384);
        assert_eq!(config.embedding.timeout_secs, 60);
        assert!(config.index_on_upload);
        assert_eq!(config.llm.anthropic_api_key, None);
    }

    #[test]
    fn test_missing_database_url_fails() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ats"),
            ("RESUME_VERSION_CAP", "0"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_embedding_dim_rejected() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ats"),
            ("EMBEDDING_DIM", "0"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_embedding_timeout_from_env() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ats"),
            ("EMBEDDING_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.embedding.timeout_secs, 5);
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!("local_llama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert_eq!("Disabled".parse::<LlmProvider>().unwrap(), LlmProvider::Disabled);
        assert!("gemini".parse::<LlmProvider>().is_err());
        assert_eq!(
            "fake".parse::<EmbeddingProvider>().unwrap(),
            EmbeddingProvider::Hashing
        );
    }

    #[test]
    fn test_invalid_port() {
        let result = config_from(&[
            ("DATABASE_URL", "postgres://localhost/ats"),
            ("PORT", "not-a-port"),
        ]);
        assert!(result.is_err());
    }
}
