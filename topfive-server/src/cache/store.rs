//! SQLite-backed key-value store with per-entry TTL
//!
//! Backs the cache layer. Entries carry an optional `expires_at` unix
//! timestamp; expired rows read as misses and are swept at startup. Writes
//! are last-write-wins: cached values are invariant once correct, so no
//! locking is needed across concurrent writers.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use topfive_common::Result;
use tracing::{debug, info};

/// SQLite key-value store
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// Open (or create) the store at `path` and prepare its schema.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        debug!("Connecting to cache database: {}", db_url);
        let pool = SqlitePool::connect(&db_url).await?;

        let store = Self { pool };
        store.init_tables().await?;
        let swept = store.purge_expired().await?;
        if swept > 0 {
            info!(swept, "expired cache entries purged at startup");
        }
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM cache_entries WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(ttl.map(expiry_timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Batched multi-get: one query, missing and expired keys absent from
    /// the result.
    pub async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT key, value FROM cache_entries WHERE key IN ({placeholders}) \
             AND (expires_at IS NULL OR expires_at > ?)"
        );

        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for key in keys {
            query = query.bind(key);
        }
        query = query.bind(Utc::now().timestamp());

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }

    /// Batched multi-set in a single transaction.
    pub async fn put_many(&self, entries: &[(String, String, Option<Duration>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for (key, value, ttl) in entries {
            sqlx::query(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)",
            )
            .bind(key)
            .bind(value)
            .bind(ttl.map(expiry_timestamp))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete every key matching the SQL LIKE `pattern`; returns the count.
    pub async fn delete_like(&self, pattern: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key LIKE ?")
            .bind(pattern)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Sweep rows whose TTL has elapsed; returns the count.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn expiry_timestamp(ttl: Duration) -> i64 {
    Utc::now().timestamp() + ttl.as_secs() as i64
}
