//! OpenAI-compatible chat-completions provider

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::{ChatMeta, ChatProvider, LlmConfig};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiProvider {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: if cfg.model.is_empty() {
                "gpt-5-mini".to_string()
            } else {
                cfg.model.clone()
            },
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

#[async_trait::async_trait]
impl ChatProvider for OpenAiProvider {
    async fn chat(&self, system: &str, user: &str) -> Result<(String, ChatMeta)> {
        if self.api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY not set");
        }
        // GPT-5 family rejects temperature and response_format overrides.
        let gpt5 = self.model.starts_with("gpt-5");
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: system },
                Message { role: "user", content: user },
            ],
            temperature: if gpt5 { None } else { self.temperature },
            max_tokens: self.max_tokens,
            response_format: if gpt5 {
                None
            } else {
                Some(ResponseFormat { kind: "json_object" })
            },
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let started = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("sending chat request")?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat API error {status}: {body}");
        }
        let body: ChatResponse = response.json().await.context("parsing chat response")?;
        tracing::debug!(model = %self.model, latency_ms, "chat completed");
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        let usage = body.usage.unwrap_or(Usage {
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
        });

        Ok((
            content,
            ChatMeta {
                model: self.model.clone(),
                endpoint: self.base_url.clone(),
                latency_ms,
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        ))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
