//! Typed reply payloads for the three prompt roles
//!
//! Any non-JSON, missing-field, or mistyped reply parses to the default
//! (empty) value; roles treat that as "the LLM had nothing".

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerReply {
    #[serde(default)]
    pub worklist: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReaderReply {
    #[serde(default)]
    pub hints: BTreeMap<String, String>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapperReply {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// Lenient parse: schema violations become the empty reply.
pub fn parse_reply<T: Default + DeserializeOwned>(content: &str) -> T {
    serde_json::from_str(content).unwrap_or_default()
}
