//! Unit tests for scriptgraph-ai

use crate::client::{LlmClient, LlmConfig};
use crate::providers::create_provider;
use crate::redact::Redactor;
use crate::schema::{MapperReply, PlannerReply, ReaderReply, parse_reply};

#[test]
fn provider_factory() {
    let disabled = create_provider(&LlmConfig::default());
    assert!(disabled.is_ok());

    let openai = create_provider(&LlmConfig {
        provider: "openai".to_string(),
        ..Default::default()
    });
    assert!(openai.is_ok());

    let unknown = create_provider(&LlmConfig {
        provider: "azure".to_string(),
        ..Default::default()
    });
    assert!(unknown.is_err());
}

#[tokio::test]
async fn disabled_provider_returns_empty_targets() {
    let client = LlmClient::disabled();
    assert!(!client.is_live());
    let (content, meta) = client.chat("system", "user").await.unwrap();
    let reply: MapperReply = parse_reply(&content);
    assert!(reply.targets.is_empty());
    assert_eq!(reply.reasoning, "LLM disabled");
    assert_eq!(meta.latency_ms, 0.0);
}

#[test]
fn mapper_reply_parses_strict_json() {
    let reply: MapperReply =
        parse_reply(r#"{"targets":["lib/load.sh"],"reasoning":"expanded $BASE"}"#);
    assert_eq!(reply.targets, vec!["lib/load.sh"]);
    assert_eq!(reply.reasoning, "expanded $BASE");
}

#[test]
fn malformed_replies_become_empty() {
    let reply: MapperReply = parse_reply("I think the answer is lib/load.sh");
    assert!(reply.targets.is_empty());

    let reply: PlannerReply = parse_reply(r#"{"worklist": "not-a-list"}"#);
    assert!(reply.worklist.is_empty());

    let reply: ReaderReply = parse_reply("");
    assert!(reply.hints.is_empty());
}

#[test]
fn planner_reply_tolerates_missing_fields() {
    let reply: PlannerReply = parse_reply(r#"{"worklist":["run.sh"]}"#);
    assert_eq!(reply.worklist, vec!["run.sh"]);
    assert!(reply.reasoning.is_empty());
}

#[test]
fn redactor_masks_sensitive_tokens() {
    let r = Redactor::default();
    let out = r.redact("ssh admin@corp.example.com 10.0.0.1 /etc/passwd");
    assert!(out.contains("<EMAIL>"));
    assert!(out.contains("<IP>"));
    assert!(out.contains("<PATH>"));
    assert!(!out.contains("10.0.0.1"));
}

#[test]
fn redactor_flags_are_independent() {
    let r = Redactor::new(false, true, false);
    let out = r.redact("mail me@example.com at 10.0.0.1 about /opt/x");
    assert!(out.contains("me@example.com"));
    assert!(out.contains("<IP>"));
    assert!(out.contains("/opt/x"));
}
