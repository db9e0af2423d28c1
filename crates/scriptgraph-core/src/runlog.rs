//! Run-event sink: progress messages, phase latencies, and LLM call records

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recorded LLM round trip. Token fields stay `None` when the
/// provider's usage block is absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmCallRecord {
    pub role: String,
    pub model: String,
    pub endpoint: String,
    pub prompt_chars: usize,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub latency_ms: f64,
    pub status: String,
    pub src: Option<String>,
    pub command_snippet: Option<String>,
    pub targets_count: usize,
    pub reasoning: Option<String>,
}

/// Sink for tagged run events. Implementations must tolerate concurrent
/// appends within a single run.
pub trait RunSink: Send + Sync {
    fn log(&self, level: &str, msg: &str);
    fn log_phase(&self, phase: &str, latency_ms: u64);
    fn log_llm(&self, record: LlmCallRecord);
    /// Record the exact prompt (pre-redacted upstream); gated by privacy config.
    fn log_prompt(&self, role: &str, prompt: &str);
}

/// Default sink: forwards everything to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl RunSink for TracingSink {
    fn log(&self, level: &str, msg: &str) {
        match level {
            "WARN" => tracing::warn!("{msg}"),
            "DEBUG" => tracing::debug!("{msg}"),
            _ => tracing::info!("{msg}"),
        }
    }

    fn log_phase(&self, phase: &str, latency_ms: u64) {
        tracing::info!(phase, latency_ms, "phase finished");
    }

    fn log_llm(&self, record: LlmCallRecord) {
        tracing::info!(
            role = %record.role,
            model = %record.model,
            status = %record.status,
            latency_ms = record.latency_ms,
            targets = record.targets_count,
            "llm call"
        );
    }

    fn log_prompt(&self, role: &str, prompt: &str) {
        tracing::debug!(role, chars = prompt.len(), "llm prompt recorded");
    }
}

/// Timestamped event kept by [`MemorySink`].
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Message { ts: DateTime<Utc>, level: String, msg: String },
    Phase { ts: DateTime<Utc>, phase: String, latency_ms: u64 },
    Llm { ts: DateTime<Utc>, record: LlmCallRecord },
    Prompt { ts: DateTime<Utc>, role: String, prompt: String },
}

/// In-memory sink for tests and post-run inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn push(&self, ev: SinkEvent) {
        if let Ok(mut v) = self.events.lock() {
            v.push(ev);
        }
    }
}

impl RunSink for MemorySink {
    fn log(&self, level: &str, msg: &str) {
        self.push(SinkEvent::Message {
            ts: Utc::now(),
            level: level.to_string(),
            msg: msg.to_string(),
        });
    }

    fn log_phase(&self, phase: &str, latency_ms: u64) {
        self.push(SinkEvent::Phase {
            ts: Utc::now(),
            phase: phase.to_string(),
            latency_ms,
        });
    }

    fn log_llm(&self, record: LlmCallRecord) {
        self.push(SinkEvent::Llm { ts: Utc::now(), record });
    }

    fn log_prompt(&self, role: &str, prompt: &str) {
        self.push(SinkEvent::Prompt {
            ts: Utc::now(),
            role: role.to_string(),
            prompt: prompt.to_string(),
        });
    }
}
