// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The SQLite tier implementation.

use std::{marker::PhantomData, path::Path, sync::Arc};

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use credence_tier::{CacheEntry, CacheKey, Error, Result, TierStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache_entries (
    key        TEXT PRIMARY KEY,
    key_hash   TEXT NOT NULL,
    payload    TEXT NOT NULL,
    cached_at  TEXT NOT NULL,
    expires_at TEXT,
    hit_count  INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_expires_at ON cache_entries (expires_at);
";

/// The durable cache tier, backed by an embedded SQLite database.
///
/// Holds one row per cache key. `get` filters logically-expired rows in SQL
/// (an expiry in the past hides the row even before it is deleted) and
/// increments the stored hit count atomically on a hit. Payloads that no
/// longer deserialize — schema drift between deployments — are logged,
/// deleted, and reported absent.
///
/// # Examples
///
/// ```
/// use credence_sqlite::SqliteTier;
/// use credence_tier::TierStore;
///
/// let tier = SqliteTier::<String>::open_in_memory()?;
/// assert!(tier.is_available());
/// # Ok::<(), credence_tier::Error>(())
/// ```
pub struct SqliteTier<V> {
    name: &'static str,
    conn: Arc<Mutex<Connection>>,
    _payload: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for SqliteTier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTier").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<V> Clone for SqliteTier<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            conn: Arc::clone(&self.conn),
            _payload: PhantomData,
        }
    }
}

impl<V> SqliteTier<V> {
    /// Opens (creating if needed) the database at `path` and applies the
    /// cache schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot
    /// be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::backend)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database, useful for tests and examples.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::backend)?;
        Self::from_connection(conn)
    }

    /// Overrides the tier name used in statistics and log lines.
    #[must_use]
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5)).map_err(Error::backend)?;
        conn.execute_batch(SCHEMA).map_err(Error::backend)?;
        Ok(Self {
            name: "sqlite",
            conn: Arc::new(Mutex::new(conn)),
            _payload: PhantomData,
        })
    }
}

impl<V> SqliteTier<V>
where
    V: Send + 'static,
{
    /// Runs `func` against the shared connection on the blocking pool.
    async fn with_conn<T, F>(&self, func: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || func(&conn.lock()))
            .await
            .map_err(Error::backend)?
    }

    /// Deletes all rows whose expiry has passed, returning how many went.
    ///
    /// Reads already filter expired rows; this sweep reclaims the space.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete statement fails.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let purged = conn
                .execute(
                    "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    params![fmt_time(Utc::now())],
                )
                .map_err(Error::backend)?;
            Ok(purged as u64)
        })
        .await
    }
}

impl<V> SqliteTier<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    fn get_row(conn: &Connection, key: &CacheKey) -> Result<Option<CacheEntry<V>>> {
        let now = fmt_time(Utc::now());
        let row: Option<(String, String, Option<String>, i64)> = conn
            .query_row(
                "SELECT payload, cached_at, expires_at, hit_count FROM cache_entries
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key.as_str(), now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(Error::backend)?;

        let Some((payload, cached_at, expires_at, hit_count)) = row else {
            return Ok(None);
        };

        let parsed = parse_row::<V>(&payload, &cached_at, expires_at.as_deref(), hit_count.max(0) as u64);
        let Some(mut entry) = parsed else {
            // Schema drift: drop the unreadable row so it stops costing reads.
            warn!(key = %key, "dropping malformed cache row");
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key.as_str()])
                .map_err(Error::backend)?;
            return Ok(None);
        };

        conn.execute(
            "UPDATE cache_entries SET hit_count = hit_count + 1 WHERE key = ?1",
            params![key.as_str()],
        )
        .map_err(Error::backend)?;
        entry.record_hit();
        Ok(Some(entry))
    }

    fn set_row(conn: &Connection, key: &CacheKey, entry: &CacheEntry<V>) -> Result<()> {
        let payload = serde_json::to_string(entry.value()).map_err(Error::backend)?;
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, key_hash, payload, cached_at, expires_at, hit_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.as_str(),
                key.digest(),
                payload,
                fmt_time(entry.cached_at()),
                entry.expires_at().map(fmt_time),
                entry.hit_count() as i64,
            ],
        )
        .map_err(Error::backend)?;
        Ok(())
    }
}

impl<V> TierStore<V> for SqliteTier<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>> {
        Box::pin(async move {
            let key = key.clone();
            self.with_conn(move |conn| Self::get_row(conn, &key)).await
        })
    }

    fn set<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let key = key.clone();
            self.with_conn(move |conn| Self::set_row(conn, &key, &entry)).await
        })
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let key = key.clone();
            self.with_conn(move |conn| {
                conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key.as_str()])
                    .map_err(Error::backend)?;
                Ok(())
            })
            .await
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.with_conn(|conn| {
                conn.execute("DELETE FROM cache_entries", []).map_err(Error::backend)?;
                Ok(())
            })
            .await
        })
    }

    fn len(&self) -> Option<u64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get::<_, i64>(0))
            .ok()
            .map(|count| count.max(0) as u64)
    }
}

fn fmt_time(time: DateTime<Utc>) -> String {
    // Fixed-width UTC text so lexicographic comparison in SQL is correct.
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).ok().map(|time| time.with_timezone(&Utc))
}

fn parse_row<V>(payload: &str, cached_at: &str, expires_at: Option<&str>, hit_count: u64) -> Option<CacheEntry<V>>
where
    V: DeserializeOwned,
{
    let value: V = serde_json::from_str(payload).ok()?;
    let cached_at = parse_time(cached_at)?;
    let expires_at = match expires_at {
        Some(text) => Some(parse_time(text)?),
        None => None,
    };
    Some(CacheEntry::from_parts(value, cached_at, expires_at, hit_count))
}
