use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::StateStore;
use crate::config::StoreConfig;
use crate::utils::error::Result;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS monitor_state (
    key TEXT PRIMARY KEY NOT NULL,
    value_json TEXT NOT NULL
)";

#[derive(Debug, FromRow)]
struct StateRow {
    key: String,
    value_json: String,
}

/// SQLite-backed store, one row per state field.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        tracing::debug!(url = %config.url, "State store ready");

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get_all(&self) -> Result<HashMap<String, Value>> {
        let rows = sqlx::query_as::<_, StateRow>("SELECT key, value_json FROM monitor_state")
            .fetch_all(&self.pool)
            .await?;

        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str(&row.value_json) {
                Ok(value) => {
                    entries.insert(row.key, value);
                }
                Err(e) => {
                    tracing::warn!(key = %row.key, error = %e, "Skipping corrupt state row");
                }
            }
        }
        Ok(entries)
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            let value_json = serde_json::to_string(&value)?;
            sqlx::query(
                "INSERT INTO monitor_state (key, value_json) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
            )
            .bind(key)
            .bind(value_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM monitor_state WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
