//! Defensive parsing of model output into typed memory operations.
//!
//! The model response is untrusted text: it may carry reasoning preambles,
//! prose around the answer, or no answer at all. Nothing in this module
//! raises on malformed input — a bad response means zero operations.

use serde::Serialize;
use tracing::{debug, warn};

use crate::ai::{self, AiConfig};
use crate::prompts::EXTRACTION_PROMPT;

/// Closing delimiter some models emit after chain-of-thought.
const THINK_END: &str = "</think>";

/// Update values must stay short; anything longer is the model echoing
/// conversation rather than naming a fact.
const MAX_VALUE_CHARS: usize = 100;

/// Interrogative tokens the model sometimes echoes back as a "value" when
/// the user asked a question instead of stating a fact.
const VALUE_DENYLIST: [&str; 6] = ["什麼", "誰", "哪", "what", "who", "where"];

/// A validated operation proposed by the model. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum MemoryOp {
    Update { key: String, value: serde_json::Value },
    /// `key` is a search term — a field label or a value fragment; the
    /// applier matches it against both columns without disambiguating.
    Delete { key: String },
}

/// Pull a JSON array of operation-like objects out of raw model text.
/// Best-effort: returns an empty vec on anything malformed.
pub fn parse_operations(raw: &str) -> Vec<serde_json::Value> {
    let mut text = raw;
    // Keep only what follows the last reasoning delimiter.
    if let Some(idx) = text.rfind(THINK_END) {
        text = &text[idx + THINK_END.len()..];
    }
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    match serde_json::from_str::<serde_json::Value>(&text[start..=end]) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "model response was not a JSON array");
            Vec::new()
        }
    }
}

/// How an update value counts against the length bound and denylist.
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Filter raw elements into typed operations, dropping anything degenerate.
/// Ordering is preserved; deduplication happens naturally in the applier.
pub fn validate_operations(items: Vec<serde_json::Value>) -> Vec<MemoryOp> {
    let mut ops = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else { continue };
        let Some(key) = obj.get("key").and_then(|k| k.as_str()) else { continue };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        // Missing action means update, kept for older prompt revisions.
        let action = obj.get("action").and_then(|a| a.as_str()).unwrap_or("update");
        match action {
            "delete" => ops.push(MemoryOp::Delete { key: key.to_string() }),
            "update" => {
                let Some(value) = obj.get("value") else { continue };
                let rendered = render_value(value);
                if rendered.trim().is_empty() || rendered.chars().count() >= MAX_VALUE_CHARS {
                    continue;
                }
                if VALUE_DENYLIST.contains(&rendered.as_str()) {
                    continue;
                }
                ops.push(MemoryOp::Update { key: key.to_string(), value: value.clone() });
            }
            _ => {}
        }
    }
    ops
}

/// Full extraction pipeline: gateway → parser → validator.
/// Gateway failures are recoverable — they yield zero operations.
pub async fn extract_operations(cfg: &AiConfig, message: &str) -> Vec<MemoryOp> {
    let user = format!("User message: 「{message}」");
    let raw = match ai::llm_chat(cfg, EXTRACTION_PROMPT, &user).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "extraction call failed, treating as no operations");
            return Vec::new();
        }
    };
    let ops = validate_operations(parse_operations(&raw));
    debug!(count = ops.len(), "extracted memory operations");
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_plain_array() {
        let ops = parse_operations(r#"[{"action":"update","key":"user_name","value":"夏天"}]"#);
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn parse_skips_think_block() {
        let raw = "<think>the user states a name</think>\n[{\"key\": \"user_name\", \"value\": \"Ana\"}]";
        let ops = parse_operations(raw);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0]["key"], "user_name");
    }

    #[test]
    fn parse_empty_on_garbage() {
        assert!(parse_operations("no brackets here").is_empty());
        assert!(parse_operations("[{not json").is_empty());
        assert!(parse_operations("] backwards [").is_empty());
    }

    #[test]
    fn validate_defaults_to_update() {
        let ops = validate_operations(vec![json!({"key": "user_age", "value": "29"})]);
        assert_eq!(
            ops,
            vec![MemoryOp::Update { key: "user_age".into(), value: json!("29") }]
        );
    }

    #[test]
    fn validate_drops_denylisted_value() {
        let ops = validate_operations(vec![
            json!({"action": "update", "key": "user_name", "value": "什麼"}),
            json!({"action": "update", "key": "user_name", "value": "who"}),
        ]);
        assert!(ops.is_empty());
    }
}
