//! Chat contract shared by all providers

use anyhow::Result;

/// Provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `disabled` or `openai`.
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: String::new(),
            base_url: "https://api.openai.com".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_ms: 60_000,
        }
    }
}

/// Transport metadata for one chat round trip.
#[derive(Debug, Clone, Default)]
pub struct ChatMeta {
    pub model: String,
    pub endpoint: String,
    pub latency_ms: f64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// A chat backend. `content` is expected to be strict JSON; callers
/// treat anything else as an empty reply.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, system: &str, user: &str) -> Result<(String, ChatMeta)>;

    fn name(&self) -> &str;

    /// False for the disabled provider: roles skip LLM stages entirely.
    fn is_live(&self) -> bool {
        true
    }
}

/// Handle the roles hold. Wraps a boxed provider.
pub struct LlmClient {
    provider: Box<dyn ChatProvider>,
}

impl LlmClient {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        Ok(Self {
            provider: crate::providers::create_provider(cfg)?,
        })
    }

    /// A client that never issues a network call.
    pub fn disabled() -> Self {
        Self {
            provider: Box::new(crate::providers::disabled::DisabledProvider),
        }
    }

    pub async fn chat(&self, system: &str, user: &str) -> Result<(String, ChatMeta)> {
        self.provider.chat(system, user).await
    }

    pub fn is_live(&self) -> bool {
        self.provider.is_live()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
