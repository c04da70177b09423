use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub status: String,
    pub daily_quota: u32,
    pub plan: String,
}

impl ApiKey {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

/// SQLite-backed API keys and per-day request counters.
///
/// Calls are blocking; async callers should go through `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct UsageStore {
    conn: Arc<Mutex<Connection>>,
}

impl UsageStore {
    pub fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create usage database directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open usage database: {db_path}"))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_database(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_database(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_keys (
                key TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'active',
                daily_quota INTEGER NOT NULL,
                plan TEXT NOT NULL DEFAULT 'free'
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_usage (
                api_key TEXT NOT NULL,
                date TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (api_key, date)
            )",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Usage database lock poisoned"))
    }

    pub fn get_api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        let conn = self.lock()?;
        let api_key = conn
            .query_row(
                "SELECT key, status, daily_quota, plan FROM api_keys WHERE key = ?",
                params![key],
                |row| {
                    Ok(ApiKey {
                        key: row.get(0)?,
                        status: row.get(1)?,
                        daily_quota: row.get(2)?,
                        plan: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(api_key)
    }

    pub fn upsert_api_key(&self, api_key: &ApiKey) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO api_keys (key, status, daily_quota, plan)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                status = excluded.status,
                daily_quota = excluded.daily_quota,
                plan = excluded.plan",
            params![api_key.key, api_key.status, api_key.daily_quota, api_key.plan],
        )?;
        Ok(())
    }

    pub fn get_usage(&self, key: &str, day: NaiveDate) -> Result<u32> {
        let conn = self.lock()?;
        let count = conn
            .query_row(
                "SELECT count FROM api_usage WHERE api_key = ? AND date = ?",
                params![key, day.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// Take one unit of today's quota. Check and increment are a single
    /// statement, so concurrent callers can never push the count past `quota`.
    /// Returns `false` when the quota is already used up.
    pub fn try_reserve_usage(&self, key: &str, day: NaiveDate, quota: u32) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "INSERT INTO api_usage (api_key, date, count)
             SELECT ?1, ?2, 1 WHERE ?3 > 0
             ON CONFLICT(api_key, date)
             DO UPDATE SET count = count + 1 WHERE count < ?3",
            params![key, day.to_string(), quota],
        )?;
        Ok(changed == 1)
    }

    /// Give back a reservation for a request that did not succeed
    pub fn release_usage(&self, key: &str, day: NaiveDate) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE api_usage SET count = count - 1
             WHERE api_key = ? AND date = ? AND count > 0",
            params![key, day.to_string()],
        )?;
        Ok(())
    }
}
