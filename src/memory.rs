//! Memory Log
//!
//! The substrate for cross-activity hand-off: an append-only execution
//! history plus an overwritable key/value store. One activity's recorded
//! output becomes another's input on a later cycle; the log imposes no
//! schema on payloads and consumers filter records themselves.
//!
//! Both structures live in memory and are mirrored to SQLite when opened
//! with a path, so the record sequence and slots survive restarts.
//! Key/value writes are last-writer-wins; no history is retained.

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::activity::ActivityResult;

/// One execution attempt, successful or not. Immutable once written;
/// insertion order is chronological order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub activity_type: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl MemoryRecord {
    /// Build a record from a normalized activity result.
    ///
    /// Enforces the tagged shape: `data` is kept only on success, `error`
    /// is present exactly when the attempt failed.
    pub fn from_result(
        activity_type: &str,
        timestamp: DateTime<Utc>,
        result: &ActivityResult,
    ) -> Self {
        let error = if result.success {
            None
        } else {
            Some(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| "activity failed without detail".to_string()),
            )
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            activity_type: activity_type.to_string(),
            timestamp,
            success: result.success,
            data: if result.success { result.data.clone() } else { None },
            error,
        }
    }
}

/// Append-only history + overwrite slots, optionally mirrored to SQLite.
pub struct MemoryLog {
    records: RwLock<Vec<MemoryRecord>>,
    slots: RwLock<HashMap<String, Value>>,
    conn: Option<Mutex<Connection>>,
}

impl MemoryLog {
    /// Volatile log, nothing persisted. Used in tests and when no database
    /// path is configured.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            slots: RwLock::new(HashMap::new()),
            conn: None,
        }
    }

    /// Open or create the backing database and load prior state.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS activity_log (
                id TEXT PRIMARY KEY,
                activity_type TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                success INTEGER NOT NULL,
                data TEXT,
                error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_activity_log_ts ON activity_log(timestamp_ms);

            CREATE TABLE IF NOT EXISTS kv_slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at_ms INTEGER NOT NULL
            );
            "#,
        )?;

        let records = Self::load_records(&conn)?;
        let slots = Self::load_slots(&conn)?;

        info!(
            "Memory log opened: {} ({} records, {} slots)",
            path.display(),
            records.len(),
            slots.len()
        );

        Ok(Self {
            records: RwLock::new(records),
            slots: RwLock::new(slots),
            conn: Some(Mutex::new(conn)),
        })
    }

    fn load_records(conn: &Connection) -> Result<Vec<MemoryRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, activity_type, timestamp_ms, success, data, error
             FROM activity_log ORDER BY timestamp_ms ASC, rowid ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                let timestamp_ms: i64 = row.get(2)?;
                let data: Option<String> = row.get(4)?;
                Ok(MemoryRecord {
                    id: row.get(0)?,
                    activity_type: row.get(1)?,
                    timestamp: Utc
                        .timestamp_millis_opt(timestamp_ms)
                        .single()
                        .unwrap_or_else(Utc::now),
                    success: row.get::<_, i64>(3)? != 0,
                    data: data.and_then(|d| serde_json::from_str(&d).ok()),
                    error: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    fn load_slots(conn: &Connection) -> Result<HashMap<String, Value>> {
        let mut stmt = conn.prepare("SELECT key, value FROM kv_slots")?;

        let slots = stmt
            .query_map([], |row| {
                let key: String = row.get(0)?;
                let value: String = row.get(1)?;
                Ok((key, value))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(k, v)| serde_json::from_str(&v).ok().map(|v| (k, v)))
            .collect();

        Ok(slots)
    }

    /// Append an execution record. Never rejects a well-formed entry; a
    /// persistence hiccup is logged and the in-memory append stands.
    pub async fn record(&self, entry: MemoryRecord) {
        if let Some(conn) = &self.conn {
            let data = entry
                .data
                .as_ref()
                .and_then(|d| serde_json::to_string(d).ok());
            let result = conn.lock().map_err(|e| e.to_string()).and_then(|c| {
                c.execute(
                    "INSERT INTO activity_log (id, activity_type, timestamp_ms, success, data, error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        entry.id,
                        entry.activity_type,
                        entry.timestamp.timestamp_millis(),
                        entry.success as i64,
                        data,
                        entry.error
                    ],
                )
                .map_err(|e| e.to_string())
            });
            if let Err(e) = result {
                warn!("Failed to persist record {}: {}", entry.id, e);
            }
        }

        self.records.write().await.push(entry);
    }

    /// Most-recent-first slice of the history, at most `limit` entries.
    /// Pure read; repeated calls return identical results absent new writes.
    pub async fn recent_activities(&self, limit: usize) -> Vec<MemoryRecord> {
        let records = self.records.read().await;
        records.iter().rev().take(limit).cloned().collect()
    }

    /// Number of records in the history.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Overwrite the slot for `key`. Last writer wins, no history.
    pub async fn store(&self, key: &str, value: Value) {
        if let Some(conn) = &self.conn {
            match serde_json::to_string(&value) {
                Ok(serialized) => {
                    let result = conn.lock().map_err(|e| e.to_string()).and_then(|c| {
                        c.execute(
                            "INSERT INTO kv_slots (key, value, updated_at_ms) VALUES (?1, ?2, ?3)
                             ON CONFLICT(key) DO UPDATE SET
                                 value = excluded.value,
                                 updated_at_ms = excluded.updated_at_ms",
                            params![key, serialized, Utc::now().timestamp_millis()],
                        )
                        .map_err(|e| e.to_string())
                    });
                    if let Err(e) = result {
                        warn!("Failed to persist slot {}: {}", key, e);
                    }
                }
                Err(e) => warn!("Failed to serialize slot {}: {}", key, e),
            }
        }

        self.slots.write().await.insert(key.to_string(), value);
    }

    /// Latest value stored under `key`, or `None` if never stored.
    pub async fn retrieve(&self, key: &str) -> Option<Value> {
        self.slots.read().await.get(key).cloned()
    }
}
