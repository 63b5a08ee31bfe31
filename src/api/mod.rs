use axum::extract::State;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::MnemoError;
use crate::AppState;

mod detect;
mod memory;

use detect::*;
use memory::*;

/// Run a blocking closure on the spawn_blocking pool and map JoinError.
async fn blocking<T, F>(f: F) -> Result<T, MnemoError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| MnemoError::Internal(e.to_string()))
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: serde_json::Value,
    pub message: String,
    pub count: usize,
}

impl ApiResponse {
    fn ok(data: serde_json::Value) -> Self {
        Self { success: true, data, message: String::new(), count: 0 }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Auth middleware: checks Bearer token if MNEMO_API_KEY is configured.
async fn require_auth(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, MnemoError> {
    let Some(ref expected) = state.api_key else {
        return Ok(next.run(req).await);
    };

    let unauthorized = || MnemoError::Unauthorized;

    let header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;

    let token = header.strip_prefix("Bearer ").ok_or_else(unauthorized)?;

    // constant-time comparison to prevent timing attacks
    if token.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(next.run(req).await)
    } else {
        Err(unauthorized())
    }
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(index))
        .route("/health", get(health));

    let protected = Router::new()
        .route(
            "/memory",
            get(get_memories).post(save_memory).delete(delete_memory),
        )
        .route("/memory/search", post(search_memories))
        .route("/memory/detect", post(detect_and_apply))
        .route("/memory/profile/{user_id}", get(get_profile))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET / — endpoint list, for humans poking at the service.
async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "mnemo",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /health": "store reachability + uptime",
            "GET /memory?userId=X&key=K": "get one record by key",
            "GET /memory?userId=X&type=T": "list records (type 'all' or omitted = every partition, 'profile' = projection)",
            "POST /memory": "create or update a record (upsert)",
            "DELETE /memory?userId=X&id=I|key=K": "delete by id or exact key",
            "POST /memory/search": "keyword search over durable partitions",
            "POST /memory/detect": "LLM detect-and-apply ({userId, message, apply})",
            "GET /memory/profile/{userId}": "profile projection shortcut",
        },
    }))
}

/// GET /health — reports unhealthy as a 200 body, never as a request failure.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let store = state.store.clone();
    let total = blocking(move || store.count()).await.and_then(|r| r);
    let uptime_secs = state.started_at.elapsed().as_secs();
    match total {
        Ok(n) => Json(serde_json::json!({
            "status": "healthy",
            "service": "mnemo",
            "version": env!("CARGO_PKG_VERSION"),
            "totalMemories": n,
            "uptime_secs": uptime_secs,
        })),
        Err(e) => Json(serde_json::json!({
            "status": "unhealthy",
            "error": e.to_string(),
            "uptime_secs": uptime_secs,
        })),
    }
}
