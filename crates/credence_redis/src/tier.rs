// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The Redis tier implementation.

use std::{
    marker::PhantomData,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use credence_tier::{CacheEntry, CacheKey, CacheRecord, Error, Result, TierStore};

use crate::RedisTierConfig;

struct Inner {
    config: RedisTierConfig,
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
    available: AtomicBool,
}

/// The distributed cache tier, backed by a Redis server.
///
/// Entries are stored as JSON [`CacheRecord`]s under prefixed keys, with TTL
/// enforced natively by the server (`SET … EX`). The connection is
/// established lazily on the first real operation; an unreachable server
/// latches the tier unavailable and all operations become immediate no-ops,
/// so the surrounding cache chain degrades transparently.
///
/// Commands run under a bounded timeout and are retried with a doubling,
/// capped backoff. A hit best-effort re-writes the record with its
/// incremented hit count, preserving the server-side TTL (`KEEPTTL`).
pub struct RedisTier<V> {
    name: &'static str,
    inner: Arc<Inner>,
    _payload: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for RedisTier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTier")
            .field("name", &self.name)
            .field("url", &self.inner.config.url)
            .field("available", &self.is_available_inner())
            .finish_non_exhaustive()
    }
}

impl<V> Clone for RedisTier<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
            _payload: PhantomData,
        }
    }
}

impl<V> RedisTier<V> {
    /// Creates a tier for the given configuration.
    ///
    /// No connection is attempted here; the first real operation connects
    /// under the configured bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the server URL cannot be parsed.
    pub fn new(config: RedisTierConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(Error::backend)?;
        Ok(Self {
            name: "redis",
            inner: Arc::new(Inner {
                config,
                client,
                manager: OnceCell::new(),
                available: AtomicBool::new(true),
            }),
            _payload: PhantomData,
        })
    }

    /// Overrides the tier name used in statistics and log lines.
    #[must_use]
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn is_available_inner(&self) -> bool {
        self.inner.available.load(Ordering::Relaxed)
    }

    fn mark_unavailable(&self) {
        if self.inner.available.swap(false, Ordering::Relaxed) {
            warn!(url = %self.inner.config.url, "distributed tier unreachable, continuing without it");
        }
    }

    fn full_key(&self, key: &CacheKey) -> String {
        format!("{}{key}", self.inner.config.key_prefix)
    }

    /// Returns the shared connection, establishing it on first use.
    async fn connection(&self) -> Result<ConnectionManager> {
        let connect_timeout = self.inner.config.connect_timeout();
        let manager = self
            .inner
            .manager
            .get_or_try_init(|| async {
                let connecting = ConnectionManager::new(self.inner.client.clone());
                match tokio::time::timeout(connect_timeout, connecting).await {
                    Ok(Ok(manager)) => Ok(manager),
                    Ok(Err(error)) => {
                        self.mark_unavailable();
                        Err(Error::backend(error))
                    }
                    Err(_) => {
                        self.mark_unavailable();
                        Err(Error::Timeout(connect_timeout))
                    }
                }
            })
            .await?;
        Ok(manager.clone())
    }

    /// Runs a command with the configured timeout, retrying with a doubling,
    /// capped backoff.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(ConnectionManager) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let command_timeout = self.inner.config.command_timeout();
        let mut backoff = self.inner.config.retry_backoff();
        let mut last_error = Error::Unavailable;

        for attempt in 0..self.inner.config.retry_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.inner.config.retry_backoff_cap());
            }
            let connection = self.connection().await?;
            match tokio::time::timeout(command_timeout, op(connection)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => last_error = Error::backend(error),
                Err(_) => last_error = Error::Timeout(command_timeout),
            }
        }
        Err(last_error)
    }
}

impl<V> RedisTier<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Best-effort write-back of an incremented hit count, keeping the
    /// server-side TTL. Losing an increment under concurrency is acceptable
    /// for a statistics field.
    async fn write_back_hit(&self, key: &CacheKey, full_key: &str, entry: &CacheEntry<V>) {
        let record = CacheRecord::from_entry(key, entry.clone());
        let Ok(json) = serde_json::to_string(&record) else {
            return;
        };
        let Ok(mut connection) = self.connection().await else {
            return;
        };
        let written: redis::RedisResult<()> = redis::cmd("SET")
            .arg(full_key)
            .arg(json)
            .arg("KEEPTTL")
            .query_async(&mut connection)
            .await;
        if let Err(error) = written {
            debug!(key = %key, %error, "hit-count write-back failed");
        }
    }
}

impl<V> TierStore<V> for RedisTier<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.is_available_inner()
    }

    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<CacheEntry<V>>>> {
        Box::pin(async move {
            if !self.is_available_inner() {
                return Ok(None);
            }

            let full_key = self.full_key(key);
            let raw: Option<String> = self
                .with_retry(|mut connection| {
                    let full_key = full_key.clone();
                    async move { connection.get(full_key).await }
                })
                .await?;

            let Some(raw) = raw else {
                return Ok(None);
            };

            let record: CacheRecord<V> = match serde_json::from_str(&raw) {
                Ok(record) => record,
                Err(error) => {
                    warn!(key = %key, %error, "dropping malformed cache record");
                    let _ = self
                        .with_retry(|mut connection| {
                            let full_key = full_key.clone();
                            async move { connection.del::<_, i64>(full_key).await }
                        })
                        .await;
                    return Ok(None);
                }
            };

            let (_, mut entry) = record.into_entry();
            if entry.is_expired() {
                return Ok(None);
            }

            entry.record_hit();
            self.write_back_hit(key, &full_key, &entry).await;
            Ok(Some(entry))
        })
    }

    fn set<'a>(&'a self, key: &'a CacheKey, entry: CacheEntry<V>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.is_available_inner() {
                return Ok(());
            }

            let ttl = entry.ttl_remaining();
            let record = CacheRecord::from_entry(key, entry);
            let json = serde_json::to_string(&record).map_err(Error::backend)?;
            let full_key = self.full_key(key);

            let _: () = self
                .with_retry(|mut connection| {
                    let full_key = full_key.clone();
                    let json = json.clone();
                    async move {
                        match ttl {
                            Some(ttl) => connection.set_ex(full_key, json, ttl.as_secs().max(1)).await,
                            None => connection.set(full_key, json).await,
                        }
                    }
                })
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.is_available_inner() {
                return Ok(());
            }

            let full_key = self.full_key(key);
            let _: i64 = self
                .with_retry(|mut connection| {
                    let full_key = full_key.clone();
                    async move { connection.del(full_key).await }
                })
                .await?;
            Ok(())
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if !self.is_available_inner() {
                return Ok(());
            }

            let pattern = format!("{}*", self.inner.config.key_prefix);
            let mut connection = self.connection().await?;
            let mut cursor: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(100)
                    .query_async(&mut connection)
                    .await
                    .map_err(Error::backend)?;

                if !keys.is_empty() {
                    let _: i64 = connection.del(keys).await.map_err(Error::backend)?;
                }

                cursor = next;
                if cursor == 0 {
                    return Ok(());
                }
            }
        })
    }
}
