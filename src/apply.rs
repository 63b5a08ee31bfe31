//! Reconciliation: applies validated operations against the store.
//!
//! Updates are upserts on `(user_id, key, 'long_term')`. Deletes are broad
//! substring matches over both columns and all memory types — the extraction
//! prompt emits one delete per lexical variant, and each is applied
//! independently; deleting an absent pattern is a no-op.

use serde::Serialize;
use tracing::info;

use crate::db::{MemoryRecord, MemoryStore, LONG_TERM};
use crate::error::MnemoError;
use crate::extract::MemoryOp;

/// What one detect-and-apply request did to the store.
#[derive(Debug, Default, Serialize)]
pub struct ApplyOutcome {
    /// Keys whose long-term record was written.
    pub applied: Vec<String>,
    /// Per deleted record, the facet the search term matched (key or value).
    pub deleted: Vec<String>,
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Report a deleted record by whichever facet matched the search term, so
/// "forget pizza" reads back as `deleted: ["pizza"]` rather than the field
/// label it happened to live under.
fn deleted_label(rec: &MemoryRecord, term: &str) -> String {
    let needle = term.to_lowercase();
    if rec.key.to_lowercase().contains(&needle) {
        rec.key.clone()
    } else {
        render_value(&rec.value)
    }
}

/// Apply operations sequentially in proposal order. A store failure aborts
/// and surfaces — silently reporting success would break durability.
pub fn apply_operations(
    store: &MemoryStore,
    user_id: &str,
    ops: &[MemoryOp],
) -> Result<ApplyOutcome, MnemoError> {
    let mut outcome = ApplyOutcome::default();
    for op in ops {
        match op {
            MemoryOp::Update { key, value } => {
                store.upsert(user_id, key, LONG_TERM, value)?;
                info!(user = user_id, key = %key, "memory updated");
                outcome.applied.push(key.clone());
            }
            MemoryOp::Delete { key } => {
                for rec in store.delete_matching(user_id, key)? {
                    info!(user = user_id, key = %rec.key, term = %key, "memory deleted");
                    outcome.deleted.push(deleted_label(&rec, key));
                }
            }
        }
    }
    Ok(outcome)
}

/// Human-readable one-liner for the caller.
pub fn summary(outcome: &ApplyOutcome) -> String {
    fn memories(n: usize) -> String {
        if n == 1 { "1 memory".into() } else { format!("{n} memories") }
    }
    let mut parts = Vec::new();
    if !outcome.applied.is_empty() {
        parts.push(format!("updated {}", memories(outcome.applied.len())));
    }
    if !outcome.deleted.is_empty() {
        parts.push(format!("deleted {}", memories(outcome.deleted.len())));
    }
    if parts.is_empty() {
        "no operations applied".into()
    } else {
        parts.join("; ")
    }
}
