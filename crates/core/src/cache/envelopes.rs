//! Envelope reads and writes within a single store.
//!
//! An envelope is a response snapshot plus the instant it was written. The
//! write timestamp is what freshness-windowed lookups are judged against.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use crate::{Error, Request, Response};

/// A stored response plus its write timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl Envelope {
    /// Stamp a response with the current time.
    pub fn now(response: Response) -> Self {
        Self { response, stored_at: Utc::now() }
    }

    pub fn stamped(response: Response, stored_at: DateTime<Utc>) -> Self {
        Self { response, stored_at }
    }

    /// Age relative to `now`; entries stamped in the future count as zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the envelope is usable as-is under a freshness window.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One entry flattened into column values.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn new(request: &Request, envelope: &Envelope) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&envelope.response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            key: request.key(),
            method: request.method().to_string(),
            url: request.url().to_string(),
            status: envelope.response.status,
            headers_json,
            body: envelope.response.body.to_vec(),
            stored_at: format_timestamp(&envelope.stored_at),
        })
    }
}

impl CacheDb {
    /// Look up the envelope stored for `request` in `store`.
    ///
    /// Returns None when either the store or the entry is absent.
    pub async fn match_entry(&self, store: &str, request: &Request) -> Result<Option<Envelope>, Error> {
        let store = store.to_string();
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<Option<Envelope>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, stored_at
                    FROM entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![store, key], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                });

                let (status, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: BTreeMap<String, String> =
                    serde_json::from_str(&headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
                let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                    .map_err(|e| Error::CorruptEntry(e.to_string()))?
                    .with_timezone(&Utc);

                Ok(Some(Envelope { response: Response::new(status, headers, body), stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Write an envelope for `request` into `store`, creating the store if needed.
    ///
    /// The store row and the entry upsert commit together; readers never
    /// observe a partially written envelope.
    pub async fn put_entry(&self, store: &str, request: &Request, envelope: &Envelope) -> Result<(), Error> {
        self.write_rows(store, vec![EntryRow::new(request, envelope)?]).await
    }

    /// Write several envelopes into `store` in one transaction: all or none.
    pub async fn put_entries(&self, store: &str, entries: &[(Request, Envelope)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, envelope)| EntryRow::new(request, envelope))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_rows(store, rows).await
    }

    async fn write_rows(&self, store: &str, rows: Vec<EntryRow>) -> Result<(), Error> {
        let store = store.to_string();
        let created_at = format_timestamp(&Utc::now());

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, created_at],
                )?;
                for row in rows {
                    tx.execute(
                        "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, stored_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                        ON CONFLICT(store, key_hash) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                        params![
                            store,
                            row.key,
                            row.method,
                            row.url,
                            row.status,
                            row.headers_json,
                            row.body,
                            row.stored_at
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a single entry. Returns whether anything was deleted.
    pub async fn delete_entry(&self, store: &str, request: &Request) -> Result<bool, Error> {
        let store = store.to_string();
        let key = request.key();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge the oldest entries of `store` until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_store(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE store = ?1 AND key_hash IN (
                        SELECT key_hash FROM entries WHERE store = ?1 ORDER BY stored_at ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
