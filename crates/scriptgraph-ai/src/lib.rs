//! LLM bridge: chat contract, providers, role prompts, and redaction

pub mod client;
pub mod prompt;
pub mod providers;
pub mod redact;
pub mod schema;

#[cfg(test)]
mod tests;

pub use client::{ChatMeta, ChatProvider, LlmClient, LlmConfig};
pub use redact::Redactor;
pub use schema::{MapperReply, PlannerReply, ReaderReply, parse_reply};
