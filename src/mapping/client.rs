//! LLM endpoint configuration and the OpenAI-compatible HTTP transport.

#[cfg(feature = "llm")]
use super::llm::{LlmRequest, LlmTransport};
#[cfg(feature = "llm")]
use crate::error::{Error, Result};
#[cfg(feature = "llm")]
use async_trait::async_trait;
use std::env;
use std::time::Duration;

/// Environment variable holding the endpoint base URL.
pub const ENV_BASE_URL: &str = "VLLM_BASE_URL";
/// Environment variable holding the model name.
pub const ENV_MODEL: &str = "VLLM_MODEL";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "VLLM_API_KEY";

/// Connection settings for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Base URL, e.g. `http://localhost:8000/v1`
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Bearer token
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl LlmConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `VLLM_BASE_URL`, `VLLM_MODEL` and `VLLM_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = non_empty_var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(model) = non_empty_var(ENV_MODEL) {
            config.model = model;
        }
        if let Some(key) = non_empty_var(ENV_API_KEY) {
            config.api_key = key;
        }
        config
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            api_key: "EMPTY".to_string(),
            timeout: Duration::from_secs(120),
            max_tokens: 4096,
            temperature: 0.1,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Transport for vLLM, OpenAI and compatible chat completion servers.
#[cfg(feature = "llm")]
#[derive(Debug, Clone)]
pub struct OpenAiCompatTransport {
    client: reqwest::Client,
    config: LlmConfig,
}

#[cfg(feature = "llm")]
impl OpenAiCompatTransport {
    /// Build an HTTP client for the configured endpoint.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// The endpoint configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn payload(&self, request: &LlmRequest, json_mode: bool) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });
        if json_mode {
            payload["response_format"] = serde_json::json!({"type": "json_object"});
        }
        payload
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?)
    }
}

#[cfg(feature = "llm")]
#[async_trait]
impl LlmTransport for OpenAiCompatTransport {
    async fn complete(&self, request: &LlmRequest) -> Result<String> {
        let mut response = self.post(&self.payload(request, true)).await?;

        // Servers without JSON mode reject `response_format`.
        if response.status().is_client_error() {
            log::debug!(
                "JSON mode rejected ({}), retrying as plain chat",
                response.status()
            );
            response = self.post(&self.payload(request, false)).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("HTTP {}: {}", status, body.trim())));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Llm("response has no choices".to_string()))
    }
}

#[cfg(feature = "llm")]
#[derive(Debug, serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[cfg(feature = "llm")]
#[derive(Debug, serde::Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(feature = "llm")]
#[derive(Debug, serde::Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.model, "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(config.api_key, "EMPTY");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn test_builder_and_url() {
        let config = LlmConfig::new()
            .with_base_url("http://gpu:9000/v1/")
            .with_model("llama")
            .with_api_key("secret")
            .with_timeout(Duration::from_secs(5))
            .with_max_tokens(512)
            .with_temperature(0.0);
        assert_eq!(config.completions_url(), "http://gpu:9000/v1/chat/completions");
        assert_eq!(config.model, "llama");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_tokens, 512);
    }

    #[cfg(feature = "llm")]
    #[test]
    fn test_payload_json_mode() {
        let transport = OpenAiCompatTransport::new(LlmConfig::default()).unwrap();
        let request = LlmRequest {
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
        };
        let with = transport.payload(&request, true);
        assert_eq!(with["response_format"]["type"], "json_object");
        assert_eq!(with["messages"][1]["content"], "user");
        assert!(transport.payload(&request, false).get("response_format").is_none());
    }
}
