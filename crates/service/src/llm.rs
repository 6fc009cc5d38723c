use crate::config::Config;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Fallback text returned when the model cannot be reached at all.
pub const UNAVAILABLE_TEXT: &str = "[model unavailable - using fallback response]";

/// Text-generation seam. Implementations never error: the boolean reports
/// whether a live model reply was obtained; `false` means no credentials,
/// network failure or provider error, and downstream code degrades to a
/// deterministic fallback.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> (String, bool);
}

/// Chat-completions client for OpenAI-compatible providers (Groq, OpenAI,
/// compatible proxies).
pub struct OpenAiCompatClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(base_url: String, model: String, api_key: Option<String>, timeout: Duration) -> Self {
        // Construction only fails when the TLS backend cannot initialize;
        // nothing can run without an HTTP client, so fail at startup.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            base_url,
            model,
            api_key,
            client,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.llm_api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "base_url": self.base_url,
            "model": self.model,
            "api_key_present": self.api_key.is_some(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> (String, bool) {
        let Some(api_key) = &self.api_key else {
            return (UNAVAILABLE_TEXT.to_string(), false);
        };

        let request = ChatRequest {
            model: &self.model,
            temperature,
            max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = match self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "chat completion request failed");
                return (UNAVAILABLE_TEXT.to_string(), false);
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "chat completion returned error status");
            return (UNAVAILABLE_TEXT.to_string(), false);
        }

        match response.json::<ChatResponse>().await {
            Ok(body) => {
                let text = body
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                (text, true)
            }
            Err(e) => {
                warn!(error = %e, "chat completion response was not parseable");
                (UNAVAILABLE_TEXT.to_string(), false)
            }
        }
    }
}

/// Scripted model for tests: replays a fixed response.
#[cfg(test)]
pub(crate) struct ScriptedModel {
    pub text: String,
    pub reached: bool,
}

#[cfg(test)]
#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, _: &str, _: &str, _: f32, _: u32) -> (String, bool) {
        (self.text.clone(), self.reached)
    }
}
