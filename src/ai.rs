//! Talks to an OpenAI-compatible chat endpoint for memory extraction.
//! Optional — see AiConfig::from_env().

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MnemoError;

fn ai_err(msg: impl Into<String>) -> MnemoError {
    MnemoError::AiBackend(msg.into())
}

const AI_TIMEOUT: Duration = Duration::from_secs(30);

/// Output-token budget for extraction calls. The expected answer is a short
/// JSON array; anything longer is the model rambling.
const MAX_TOKENS: u32 = 200;

#[derive(Clone)]
pub struct AiConfig {
    pub llm_url: String,
    pub llm_key: String,
    pub llm_model: String,
    pub client: reqwest::Client,
}

impl AiConfig {
    /// Returns `None` if `MNEMO_LLM_URL` is not set — extraction then
    /// degrades to "no operations detected".
    pub fn from_env() -> Option<Self> {
        let llm_url = std::env::var("MNEMO_LLM_URL").ok()?;
        let llm_key = std::env::var("MNEMO_LLM_KEY").unwrap_or_default();
        let llm_model =
            std::env::var("MNEMO_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

        let client = reqwest::Client::builder()
            .timeout(AI_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Some(Self { llm_url, llm_key, llm_model, client })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Send a chat completion request, return the raw response text.
/// Near-deterministic (temperature 0.1) with a bounded token budget.
pub async fn llm_chat(cfg: &AiConfig, system: &str, user: &str) -> Result<String, MnemoError> {
    let req = ChatRequest {
        model: cfg.llm_model.clone(),
        messages: vec![
            ChatMessage { role: "system".into(), content: system.into() },
            ChatMessage { role: "user".into(), content: user.into() },
        ],
        temperature: 0.1,
        max_tokens: MAX_TOKENS,
    };

    let mut builder = cfg.client.post(&cfg.llm_url).json(&req);
    if !cfg.llm_key.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {}", cfg.llm_key));
    }

    let resp = builder
        .send()
        .await
        .map_err(|e| ai_err(format!("LLM request failed: {e}")))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(ai_err(format!("LLM returned {status}: {body}")));
    }

    let chat: ChatResponse = resp
        .json()
        .await
        .map_err(|e| ai_err(format!("LLM response parse failed: {e}")))?;
    let content = chat
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    Ok(content)
}
