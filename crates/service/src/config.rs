use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Env-driven configuration (`.env` honored via dotenvy). Every field has
/// a default so the services come up without any environment at all; a
/// missing API key just means the model path degrades to fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    /// A stalled provider must not hang a worker; applied to every
    /// outbound HTTP call.
    pub request_timeout_secs: u64,
    pub storage_dir: PathBuf,
    pub cache_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_base_url: "https://api.groq.com/openai/v1".to_string(),
            llm_model: "llama-3.1-8b-instant".to_string(),
            llm_api_key: None,
            embedding_base_url: "http://localhost:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            embedding_dimension: 384,
            request_timeout_secs: 60,
            storage_dir: PathBuf::from("storage"),
            cache_enabled: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            llm_base_url: env_or("LLM_BASE_URL", defaults.llm_base_url),
            llm_model: env_or("LLM_MODEL", defaults.llm_model),
            llm_api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            embedding_base_url: env_or("EMBEDDING_BASE_URL", defaults.embedding_base_url),
            embedding_model: env_or("EMBEDDING_MODEL", defaults.embedding_model),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", defaults.embedding_dimension),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            storage_dir: PathBuf::from(env_or(
                "STORAGE_DIR",
                defaults.storage_dir.to_string_lossy().into_owned(),
            )),
            cache_enabled: parse_or("CACHE_ENABLED", defaults.cache_enabled),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_env() {
        let config = Config::default();
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.cache_enabled);
        assert!(config.llm_api_key.is_none());
    }
}
