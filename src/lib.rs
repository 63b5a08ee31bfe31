pub mod ai;
pub mod api;
pub mod apply;
pub mod db;
pub mod error;
pub mod extract;
pub mod prompts;

use std::sync::Arc;

pub type SharedStore = Arc<db::MemoryStore>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub ai: Option<ai::AiConfig>,
    pub api_key: Option<String>,
    pub started_at: std::time::Instant,
}
