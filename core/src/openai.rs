//! OpenAI chat-completion client

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::UpstreamError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI API client, always asking for a JSON object response
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    model: String,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    total_tokens: i64,
}

/// Raw completion text plus call metadata
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model_used: String,
    pub tokens_used: i64,
    pub latency_ms: u64,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(api_key, DEFAULT_BASE_URL.to_string(), DEFAULT_MODEL.to_string())
    }

    pub fn with_config(api_key: String, base_url: String, model: String) -> Self {
        Self::with_options(api_key, base_url, model, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Same endpoint and model, different key
    pub fn with_api_key(&self, api_key: String) -> Self {
        Self {
            api_key,
            ..self.clone()
        }
    }

    /// Send one system + user exchange and return the first choice's text
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<Completion, UpstreamError> {
        let request_body = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                OpenAiMessage {
                    role: "user",
                    content: user_content.to_string(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: self.temperature,
        };

        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::new(format!(
                "OpenAI API error {status}: {body}"
            )));
        }

        let openai_response: OpenAiResponse = response.json().await?;
        let latency = start.elapsed().as_millis() as u64;

        let text = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let tokens_used = openai_response.usage.map(|u| u.total_tokens).unwrap_or(0);

        info!(
            "OpenAI response: {} tokens, {}ms latency",
            tokens_used, latency
        );

        Ok(Completion {
            text,
            model_used: openai_response.model,
            tokens_used,
            latency_ms: latency,
        })
    }
}
