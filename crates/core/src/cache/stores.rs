//! Store-level registry operations.
//!
//! Stores are addressed by full name (`static-v3`); the three logical names
//! a worker version owns are derived from its version string.

use std::collections::BTreeSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use crate::Error;

/// The three logical stores each worker version owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalStore {
    Static,
    Dynamic,
    Api,
}

impl LogicalStore {
    pub const ALL: [LogicalStore; 3] = [LogicalStore::Static, LogicalStore::Dynamic, LogicalStore::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalStore::Static => "static",
            LogicalStore::Dynamic => "dynamic",
            LogicalStore::Api => "api",
        }
    }

    /// Versioned store name, `{logical}-v{version}`.
    pub fn store_name(&self, version: &str) -> String {
        format!("{}-v{}", self.as_str(), version)
    }

    /// The full set of store names considered current for `version`.
    pub fn current_names(version: &str) -> BTreeSet<String> {
        Self::ALL.iter().map(|s| s.store_name(version)).collect()
    }
}

/// Entry count for one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoreStats {
    pub name: String,
    pub entries: u64,
}

impl CacheDb {
    /// Ensure a store exists. Idempotent.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Enumerate every store currently present, sorted by name.
    pub async fn list_stores(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts for every store, sorted by name.
    pub async fn store_stats(&self) -> Result<Vec<StoreStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, COUNT(e.key_hash)
                    FROM stores s LEFT JOIN entries e ON e.store = s.name
                    GROUP BY s.name ORDER BY s.name",
                )?;
                let stats = stmt
                    .query_map([], |row| Ok(StoreStats { name: row.get(0)?, entries: row.get::<_, i64>(1)? as u64 }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every store whose name is not in `current`.
    ///
    /// Returns the deleted names. Deleting is by name and idempotent, so a
    /// pass interrupted midway is completed by the next one.
    pub async fn delete_stores_not_in(&self, current: &BTreeSet<String>) -> Result<Vec<String>, Error> {
        let current = current.clone();
        self.delete_stores_where(move |name| !current.contains(name)).await
    }

    /// Delete every store regardless of version.
    pub async fn delete_all_stores(&self) -> Result<Vec<String>, Error> {
        self.delete_stores_where(|_| true).await
    }

    /// Delete every store whose name satisfies `predicate`.
    pub async fn delete_stores_where<F>(&self, predicate: F) -> Result<Vec<String>, Error>
    where
        F: Fn(&str) -> bool + Send + 'static,
    {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let names: Vec<String> = {
                    let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                    stmt.query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?
                };

                let mut deleted = Vec::new();
                for name in names.into_iter().filter(|n| predicate(n.as_str())) {
                    let tx = conn.unchecked_transaction()?;
                    tx.execute("DELETE FROM entries WHERE store = ?1", params![name])?;
                    tx.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                    tx.commit()?;
                    deleted.push(name);
                }
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }
}
