//! Direct CRUD surface — thin pass-throughs to the store.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{blocking, ApiResponse};
use crate::db;
use crate::error::MnemoError;
use crate::AppState;

fn to_value<T: serde::Serialize>(v: &T) -> Result<serde_json::Value, MnemoError> {
    serde_json::to_value(v).map_err(|e| MnemoError::Internal(e.to_string()))
}

#[derive(Deserialize)]
pub(super) struct GetQuery {
    #[serde(rename = "userId")]
    user_id: String,
    key: Option<String>,
    #[serde(rename = "type")]
    memory_type: Option<String>,
}

/// GET /memory — one record by key, a profile projection, or a listing.
pub(super) async fn get_memories(
    State(state): State<AppState>,
    Query(q): Query<GetQuery>,
) -> Result<Json<ApiResponse>, MnemoError> {
    let store = state.store.clone();
    let resp = blocking(move || -> Result<ApiResponse, MnemoError> {
        if q.memory_type.as_deref() == Some("profile") {
            let profile = store.profile(&q.user_id)?;
            let count = profile.len();
            return Ok(ApiResponse::ok(serde_json::Value::Object(profile)).with_count(count));
        }
        if let Some(ref key) = q.key {
            return match store.find_by_key(&q.user_id, key)? {
                Some(rec) => Ok(ApiResponse::ok(to_value(&rec)?).with_count(1)),
                None => Ok(ApiResponse::ok(serde_json::Value::Null)),
            };
        }
        // 'all' and no filter both mean every partition
        let memory_type = q.memory_type.as_deref().filter(|t| *t != "all");
        let records = store.list(&q.user_id, memory_type)?;
        let count = records.len();
        Ok(ApiResponse::ok(to_value(&records)?).with_count(count))
    })
    .await??;
    Ok(Json(resp))
}

/// POST /memory — validated upsert.
pub(super) async fn save_memory(
    State(state): State<AppState>,
    Json(input): Json<db::MemoryInput>,
) -> Result<Json<ApiResponse>, MnemoError> {
    let store = state.store.clone();
    let rec = blocking(move || store.save(input)).await??;

    // A fresh insert leaves both timestamps equal; an upsert refreshes
    // updated_at only.
    let action = if rec.created_at == rec.updated_at { "created" } else { "updated" };
    let message = format!("Memory '{}' {} successfully", rec.key, action);
    Ok(Json(ApiResponse::ok(to_value(&rec)?).with_message(message)))
}

#[derive(Deserialize)]
pub(super) struct DeleteQuery {
    #[serde(rename = "userId")]
    user_id: String,
    key: Option<String>,
    id: Option<String>,
}

/// DELETE /memory — by id or exact key; one of the two is required.
pub(super) async fn delete_memory(
    State(state): State<AppState>,
    Query(q): Query<DeleteQuery>,
) -> Result<Json<ApiResponse>, MnemoError> {
    let store = state.store.clone();
    let deleted = blocking(move || -> Result<usize, MnemoError> {
        if let Some(ref id) = q.id {
            Ok(store.delete_by_id(&q.user_id, id)? as usize)
        } else if let Some(ref key) = q.key {
            store.delete_by_key(&q.user_id, key)
        } else {
            Err(MnemoError::Validation("either key or id is required".into()))
        }
    })
    .await??;

    Ok(Json(
        ApiResponse::ok(serde_json::Value::Null)
            .with_message("Memory deleted successfully")
            .with_count(deleted),
    ))
}

#[derive(Deserialize)]
pub(super) struct SearchBody {
    #[serde(rename = "userId")]
    user_id: String,
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

/// POST /memory/search — keyword search over durable partitions.
pub(super) async fn search_memories(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<ApiResponse>, MnemoError> {
    let store = state.store.clone();
    let query = body.query.clone();
    let limit = body.limit.min(100);
    let records = blocking(move || store.search(&body.user_id, &body.query, limit)).await??;

    let count = records.len();
    let message = format!("Found {count} memories matching '{query}'");
    Ok(Json(ApiResponse::ok(to_value(&records)?).with_message(message).with_count(count)))
}

/// GET /memory/profile/{user_id} — profile projection shortcut.
pub(super) async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse>, MnemoError> {
    let store = state.store.clone();
    let profile = blocking(move || store.profile(&user_id)).await??;
    let count = profile.len();
    Ok(Json(ApiResponse::ok(serde_json::Value::Object(profile)).with_count(count)))
}
