//! Budget envelope and its runtime enforcement

use std::time::Instant;

use serde::Serialize;

/// Numeric caps on total work. Enforced by the Reader (`max_files`) and
/// the Mapper (`max_tool_calls`, `max_latency_ms`); `max_loops` bounds
/// the re-read pass in the runner.
#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub max_tool_calls: u32,
    pub max_latency_ms: u64,
    pub max_loops: u32,
    pub max_files: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_tool_calls: 100,
            max_latency_ms: 60_000,
            max_loops: 1,
            max_files: 60,
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Budget {
    /// Defaults with integer overrides from the environment:
    /// `MAX_TOOL_CALLS`, `MAX_LAT_MS`, `MAX_LOOPS`, `MAX_FILES`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_tool_calls: env_usize("MAX_TOOL_CALLS", d.max_tool_calls as usize) as u32,
            max_latency_ms: env_usize("MAX_LAT_MS", d.max_latency_ms as usize) as u64,
            max_loops: env_usize("MAX_LOOPS", d.max_loops as usize) as u32,
            max_files: env_usize("MAX_FILES", d.max_files),
        }
    }
}

/// Tracks spend against a budget across the whole run (both mapper
/// passes share one tracker).
#[derive(Debug)]
pub struct BudgetTracker {
    budget: Budget,
    tool_calls: u32,
    started: Instant,
}

impl BudgetTracker {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            tool_calls: 0,
            started: Instant::now(),
        }
    }

    /// Reserve one LLM call. Returns false once the call or latency cap
    /// is hit; the caller degrades to heuristics.
    pub fn try_tool_call(&mut self) -> bool {
        if self.tool_calls >= self.budget.max_tool_calls {
            return false;
        }
        if self.started.elapsed().as_millis() as u64 >= self.budget.max_latency_ms {
            return false;
        }
        self.tool_calls += 1;
        true
    }

    pub fn tool_calls(&self) -> u32 {
        self.tool_calls
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }
}
