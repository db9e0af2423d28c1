//! Chat provider implementations

pub mod disabled;
pub mod openai;

use anyhow::Result;

use crate::client::{ChatProvider, LlmConfig};

/// Factory keyed by the configured provider name.
pub fn create_provider(cfg: &LlmConfig) -> Result<Box<dyn ChatProvider>> {
    match cfg.provider.as_str() {
        "disabled" => Ok(Box::new(disabled::DisabledProvider)),
        "openai" => Ok(Box::new(openai::OpenAiProvider::new(cfg)?)),
        other => anyhow::bail!("unknown LLM provider: {other}"),
    }
}
