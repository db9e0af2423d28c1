//! No-op provider used when LLM assistance is switched off

use anyhow::Result;

use crate::client::{ChatMeta, ChatProvider};

pub struct DisabledProvider;

#[async_trait::async_trait]
impl ChatProvider for DisabledProvider {
    async fn chat(&self, _system: &str, _user: &str) -> Result<(String, ChatMeta)> {
        Ok((
            r#"{"targets":[],"reasoning":"LLM disabled"}"#.to_string(),
            ChatMeta::default(),
        ))
    }

    fn name(&self) -> &str {
        "disabled"
    }

    fn is_live(&self) -> bool {
        false
    }
}
