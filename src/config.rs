//! Run configuration loaded from a YAML file

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_provider() -> String {
    "disabled".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_true() -> bool {
    true
}

fn default_include_ext() -> Vec<String> {
    scriptgraph_indexer::SCRIPT_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            base_url: default_base_url(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrivacySection {
    pub log_prompts: bool,
    #[serde(default = "default_true")]
    pub redact_paths: bool,
    #[serde(default = "default_true")]
    pub redact_ips: bool,
    #[serde(default = "default_true")]
    pub redact_emails: bool,
}

impl Default for PrivacySection {
    fn default() -> Self {
        Self {
            log_prompts: false,
            redact_paths: true,
            redact_ips: true,
            redact_emails: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParsingSection {
    #[serde(default = "default_include_ext")]
    pub include_ext: Vec<String>,
}

impl Default for ParsingSection {
    fn default() -> Self {
        Self {
            include_ext: default_include_ext(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentsSection {
    pub reader_hints: bool,
}

/// Top-level run configuration. Unknown keys are ignored; a missing
/// file yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub privacy: PrivacySection,
    pub parsing: ParsingSection,
    pub agents: AgentsSection,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn llm_config(&self) -> scriptgraph_ai::LlmConfig {
        scriptgraph_ai::LlmConfig {
            provider: self.llm.provider.clone(),
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            ..Default::default()
        }
    }

    pub fn redactor(&self) -> scriptgraph_ai::Redactor {
        scriptgraph_ai::Redactor::new(
            self.privacy.redact_paths,
            self.privacy.redact_ips,
            self.privacy.redact_emails,
        )
    }
}
