//! Persistence boundary for [`MonitorState`](crate::models::MonitorState).
//!
//! Storage is a flat key-value map of JSON values, one key per state field.
//! [`StateHandle`] layers the named read/modify/write operations on top.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::utils::error::Result;

pub mod handle;
pub mod memory;
pub mod sqlite;

pub use handle::StateHandle;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_all(&self) -> Result<HashMap<String, Value>>;

    /// Writes all entries or none of them.
    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn StateStore>> {
    let store = SqliteStore::connect(config).await?;
    Ok(Arc::new(store))
}
