//! Detect-and-apply: the LLM extraction pipeline wired to the store.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use super::{blocking, ApiResponse};
use crate::apply::{self, ApplyOutcome};
use crate::error::MnemoError;
use crate::extract;
use crate::AppState;

#[derive(Deserialize)]
pub(super) struct DetectBody {
    #[serde(rename = "userId")]
    user_id: String,
    message: String,
    /// false = dry run: detection only, no store mutation.
    #[serde(default = "default_apply")]
    apply: bool,
}

fn default_apply() -> bool {
    true
}

/// POST /memory/detect
///
/// Extraction failures (gateway down, malformed response) degrade to zero
/// detected operations. A store failure while applying is surfaced — the
/// caller must not be told mutations succeeded when they may not have.
pub(super) async fn detect_and_apply(
    State(state): State<AppState>,
    Json(body): Json<DetectBody>,
) -> Result<Json<ApiResponse>, MnemoError> {
    let detected = match &state.ai {
        Some(cfg) => extract::extract_operations(cfg, &body.message).await,
        None => {
            debug!("AI not configured; detection yields no operations");
            Vec::new()
        }
    };

    if detected.is_empty() {
        return Ok(Json(
            ApiResponse::ok(serde_json::json!({
                "detected": [],
                "applied": [],
                "deleted": [],
            }))
            .with_message("No memory operations detected"),
        ));
    }

    let outcome = if body.apply {
        let store = state.store.clone();
        let user_id = body.user_id.clone();
        let ops = detected.clone();
        blocking(move || apply::apply_operations(&store, &user_id, &ops)).await??
    } else {
        ApplyOutcome::default()
    };

    let message = apply::summary(&outcome);
    let count = detected.len();
    Ok(Json(
        ApiResponse::ok(serde_json::json!({
            "detected": detected,
            "applied": outcome.applied,
            "deleted": outcome.deleted,
        }))
        .with_message(message)
        .with_count(count),
    ))
}
