//! mnemo — personal memory API service.
//! Free-text messages in, LLM-extracted key/value memories out.

use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mnemo::{ai, api, db, AppState, SharedStore};

#[derive(Parser)]
#[command(name = "mnemo", version, about = "Personal memory API service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8021", env = "MNEMO_PORT")]
    port: u16,

    /// SQLite database path
    #[arg(short, long, default_value = "mnemo.db", env = "MNEMO_DB")]
    db: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let store = db::MemoryStore::open(&args.db).expect("failed to open database");
    let shared: SharedStore = Arc::new(store);

    let ai_cfg = ai::AiConfig::from_env();
    let ai_status = match &ai_cfg {
        Some(cfg) => format!("llm={}", cfg.llm_model),
        None => "disabled".into(),
    };

    let api_key = std::env::var("MNEMO_API_KEY").ok();
    let auth_status = if api_key.is_some() { "enabled" } else { "disabled" };

    let state = AppState {
        store: shared,
        ai: ai_cfg,
        api_key,
        started_at: std::time::Instant::now(),
    };
    let app = api::router(state);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        db = %args.db,
        ai = %ai_status,
        auth = auth_status,
        "mnemo starting"
    );

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    info!("shutting down");
}
