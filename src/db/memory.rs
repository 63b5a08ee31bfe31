//! CRUD, search, and fuzzy-delete primitives.

use rusqlite::params;
use uuid::Uuid;

use super::{now_ms, row_to_record, validate_input, MemoryInput, MemoryRecord, MemoryStore};
use super::{ENTITY, LONG_TERM};
use crate::error::MnemoError;

const RECORD_COLS: &str = "id, user_id, key, value, memory_type, created_at, updated_at";

/// Wrap a search term for substring LIKE matching, escaping LIKE wildcards.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

impl MemoryStore {
    /// Insert-or-update on the `(user_id, key, memory_type)` triple.
    /// On conflict the value is overwritten and `updated_at` refreshed;
    /// `id` and `created_at` stay with the original record.
    pub fn upsert(
        &self,
        user_id: &str,
        key: &str,
        memory_type: &str,
        value: &serde_json::Value,
    ) -> Result<MemoryRecord, MnemoError> {
        let conn = self.conn()?;
        let id = Uuid::new_v4().to_string();
        let now = now_ms();
        let value_json = serde_json::to_string(value)
            .map_err(|e| MnemoError::Internal(format!("value serialize: {e}")))?;
        let rec = conn.query_row(
            &format!(
                "INSERT INTO memories ({RECORD_COLS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
                 ON CONFLICT(user_id, key, memory_type) DO UPDATE \
                 SET value = excluded.value, updated_at = excluded.updated_at \
                 RETURNING {RECORD_COLS}"
            ),
            params![id, user_id, key, value_json, memory_type, now],
            row_to_record,
        )?;
        Ok(rec)
    }

    /// Validated create-or-update for the direct CRUD surface.
    pub fn save(&self, input: MemoryInput) -> Result<MemoryRecord, MnemoError> {
        validate_input(&input)?;
        self.upsert(&input.user_id, input.key.trim(), &input.memory_type, &input.value)
    }

    /// Exact lookup on the uniqueness triple.
    pub fn find(
        &self,
        user_id: &str,
        key: &str,
        memory_type: &str,
    ) -> Result<Option<MemoryRecord>, MnemoError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLS} FROM memories \
             WHERE user_id = ?1 AND key = ?2 AND memory_type = ?3"
        ))?;
        let mut rows = stmt.query(params![user_id, key, memory_type])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// Exact key lookup across all memory types; newest first if several.
    pub fn find_by_key(&self, user_id: &str, key: &str) -> Result<Option<MemoryRecord>, MnemoError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLS} FROM memories \
             WHERE user_id = ?1 AND key = ?2 ORDER BY updated_at DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![user_id, key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// List a user's records, optionally restricted to one memory type.
    pub fn list(
        &self,
        user_id: &str,
        memory_type: Option<&str>,
    ) -> Result<Vec<MemoryRecord>, MnemoError> {
        let conn = self.conn()?;
        let records = match memory_type {
            Some(mt) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLS} FROM memories \
                     WHERE user_id = ?1 AND memory_type = ?2 ORDER BY updated_at DESC"
                ))?;
                let rows = stmt.query_map(params![user_id, mt], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {RECORD_COLS} FROM memories \
                     WHERE user_id = ?1 ORDER BY updated_at DESC"
                ))?;
                let rows = stmt.query_map(params![user_id], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(records)
    }

    /// Fuzzy delete: case-insensitive substring match of `term` against both
    /// the key and the serialized value, across ALL memory types for the
    /// user. Returns the deleted records; an absent pattern is a no-op.
    pub fn delete_matching(
        &self,
        user_id: &str,
        term: &str,
    ) -> Result<Vec<MemoryRecord>, MnemoError> {
        let conn = self.conn()?;
        let pattern = like_pattern(term);
        let mut stmt = conn.prepare(&format!(
            "DELETE FROM memories \
             WHERE user_id = ?1 \
               AND (key LIKE ?2 ESCAPE '\\' OR value LIKE ?2 ESCAPE '\\') \
             RETURNING {RECORD_COLS}"
        ))?;
        let rows = stmt.query_map(params![user_id, pattern], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_by_id(&self, user_id: &str, id: &str) -> Result<bool, MnemoError> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM memories WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(n > 0)
    }

    /// Exact-key delete across all memory types. Returns how many were removed.
    pub fn delete_by_key(&self, user_id: &str, key: &str) -> Result<usize, MnemoError> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM memories WHERE user_id = ?1 AND key = ?2",
            params![user_id, key],
        )?;
        Ok(n)
    }

    /// Keyword search over the durable partitions (long_term + entity),
    /// most-recently-updated first.
    pub fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MnemoError> {
        let conn = self.conn()?;
        let pattern = like_pattern(query);
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLS} FROM memories \
             WHERE user_id = ?1 \
               AND (key LIKE ?2 ESCAPE '\\' OR value LIKE ?2 ESCAPE '\\') \
               AND memory_type IN (?3, ?4) \
             ORDER BY updated_at DESC LIMIT ?5"
        ))?;
        let rows = stmt.query_map(
            params![user_id, pattern, LONG_TERM, ENTITY, limit as i64],
            row_to_record,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fixed-vocabulary projection over a user's long-term keys.
    pub fn profile(
        &self,
        user_id: &str,
    ) -> Result<serde_json::Map<String, serde_json::Value>, MnemoError> {
        const PROFILE_KEYS: [&str; 7] =
            ["name", "interest", "hobby", "favorite", "occupation", "age", "location"];
        let mut profile = serde_json::Map::new();
        for rec in self.list(user_id, Some(LONG_TERM))? {
            let key_lower = rec.key.to_lowercase();
            if PROFILE_KEYS.iter().any(|pk| key_lower.contains(pk)) {
                profile.insert(rec.key, rec.value);
            }
        }
        Ok(profile)
    }

    /// Total records across all users. Used by the health probe.
    pub fn count(&self) -> Result<i64, MnemoError> {
        let conn = self.conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;
        Ok(n)
    }
}
