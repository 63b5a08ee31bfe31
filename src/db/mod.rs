//! SQLite-backed per-user key/value memory store.

mod memory;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use crate::error::MnemoError;

/// Set busy_timeout on every connection handed out by the pool.
/// Prevents SQLITE_BUSY under concurrent write pressure.
#[derive(Debug)]
struct BusyTimeoutCustomizer;
impl r2d2::CustomizeConnection<rusqlite::Connection, rusqlite::Error> for BusyTimeoutCustomizer {
    fn on_acquire(&self, conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    }
}

type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// The durable partition holding stable personal facts.
pub const LONG_TERM: &str = "long_term";
/// Entity-scoped partition; readable by search, never written by extraction.
pub const ENTITY: &str = "entity";

const MAX_KEY_LEN: usize = 128;
const MAX_VALUE_LEN: usize = 8192;

/// One fact about one user. `value` holds arbitrary JSON; it is stored as
/// serialized text in the `value` column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub key: String,
    pub value: serde_json::Value,
    pub memory_type: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInput {
    pub user_id: String,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default = "default_memory_type")]
    pub memory_type: String,
}

fn default_memory_type() -> String {
    LONG_TERM.into()
}

pub(crate) fn validate_input(input: &MemoryInput) -> Result<(), MnemoError> {
    if input.user_id.trim().is_empty() {
        return Err(MnemoError::Validation("userId must not be empty".into()));
    }
    let key = input.key.trim();
    if key.is_empty() {
        return Err(MnemoError::Validation("key must not be empty".into()));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(MnemoError::Validation(format!("key too long (max {MAX_KEY_LEN})")));
    }
    if input.memory_type.trim().is_empty() {
        return Err(MnemoError::Validation("memoryType must not be empty".into()));
    }
    let rendered = serde_json::to_string(&input.value).unwrap_or_default();
    if rendered.chars().count() > MAX_VALUE_LEN {
        return Err(MnemoError::Validation(format!("value too long (max {MAX_VALUE_LEN})")));
    }
    Ok(())
}

pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_millis() as i64
}

// The UNIQUE index is what makes upserts atomic: INSERT .. ON CONFLICT
// targets (user_id, key, memory_type), so at most one record exists per
// triple and concurrent updates serialize at the storage layer.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    memory_type TEXT NOT NULL DEFAULT 'long_term',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_user_key_type
    ON memories(user_id, key, memory_type);
CREATE INDEX IF NOT EXISTS idx_user_updated
    ON memories(user_id, updated_at);
"#;

/// SQLite-backed memory store. Construct once at startup, share via `Arc`.
pub struct MemoryStore {
    pool: Pool<SqliteConnectionManager>,
}

impl MemoryStore {
    fn conn(&self) -> Result<PooledConn, MnemoError> {
        self.pool.get().map_err(|e| MnemoError::Internal(format!("pool: {e}")))
    }

    /// Open (or create) a database at the given path.
    /// Pool size defaults to 8 (1 writer + 7 readers in WAL mode).
    pub fn open(path: &str) -> Result<Self, MnemoError> {
        let pool_size = if path == ":memory:" { 2 } else { 8 };
        let manager = if path == ":memory:" {
            // Shared cache so all pool connections see the same in-memory DB.
            // Each test gets a unique name to avoid cross-test pollution.
            let name = uuid::Uuid::new_v4().to_string();
            SqliteConnectionManager::file(format!("file:{name}?mode=memory&cache=shared"))
        } else {
            SqliteConnectionManager::file(path)
        };
        let pool = Pool::builder()
            .max_size(pool_size)
            .connection_customizer(Box::new(BusyTimeoutCustomizer))
            .build(manager)
            .map_err(|e| MnemoError::Internal(format!("pool: {e}")))?;

        let conn = pool.get().map_err(|e| MnemoError::Internal(e.to_string()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);

        Ok(Self { pool })
    }
}

/// Column order: id, user_id, key, value, memory_type, created_at, updated_at
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MemoryRecord> {
    let raw: String = row.get("value")?;
    // Values are written as serialized JSON; tolerate rows written by hand.
    let value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
    Ok(MemoryRecord {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        key: row.get("key")?,
        value,
        memory_type: row.get("memory_type")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
