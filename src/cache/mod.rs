//! Hash cache (component C5): per-hash memoization in front of the
//! fingerprint store, with write-through population on store miss and
//! TTL-only invalidation.

pub mod codec;

use std::collections::HashMap;
use std::time::Duration;

use crate::config::CacheConfig;

/// Wraps a `redis::Client`. If the client can't be reached at construction
/// time the cache degrades to a no-op: every `get_many` call reports total
/// miss and `put_many` is a no-op, matching spec.md §4.5's requirement that
/// an unreachable cache never fails recognition.
pub struct Cache {
    client: Option<redis::Client>,
    key_prefix: String,
    default_ttl: Duration,
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl Cache {
    pub fn connect(cfg: &CacheConfig) -> crate::error::Result<Self> {
        cfg.validate()?;
        let mut cache = Cache {
            client: None,
            key_prefix: cfg.key_prefix.clone(),
            default_ttl: cfg.ttl,
            connect_timeout: cfg.connect_timeout,
            operation_timeout: cfg.operation_timeout,
        };

        match redis::Client::open(cfg.redis_url()) {
            Ok(client) => match cache.open_connection(&client) {
                Ok(_) => cache.client = Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "hash cache unreachable at startup, degrading to direct-store mode");
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "hash cache configuration rejected, degrading to direct-store mode");
            }
        }

        Ok(cache)
    }

    fn key(&self, hash: u64) -> String {
        format!("{}:{}", self.key_prefix, hash)
    }

    /// Opens a connection bounded by the configured connect timeout, then
    /// applies the configured operation (read/write) timeout to it.
    fn open_connection(&self, client: &redis::Client) -> redis::RedisResult<redis::Connection> {
        let mut conn = client.get_connection_with_timeout(self.connect_timeout)?;
        conn.set_read_timeout(Some(self.operation_timeout))?;
        conn.set_write_timeout(Some(self.operation_timeout))?;
        Ok(conn)
    }

    /// Looks up every hash in one pipelined round trip. Hashes absent from
    /// the returned map are misses; a cache-unavailable condition is
    /// recovered locally (logged once, reported as a total miss) rather than
    /// surfaced to the caller.
    pub fn get_many(&self, hashes: &[u64]) -> HashMap<u64, Vec<(String, u32)>> {
        let mut out = HashMap::new();
        if hashes.is_empty() {
            return out;
        }
        let Some(client) = &self.client else {
            return out;
        };

        let mut conn = match self.open_connection(client) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "hash cache connection failed, falling back to the store");
                return out;
            }
        };

        let mut pipe = redis::pipe();
        for &hash in hashes {
            pipe.get(self.key(hash));
        }

        let raw: Vec<Option<Vec<u8>>> = match pipe.query(&mut conn) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(error = %e, "hash cache pipeline read failed, falling back to the store");
                return out;
            }
        };

        for (hash, bytes) in hashes.iter().zip(raw.into_iter()) {
            if let Some(bytes) = bytes {
                match codec::decode(&bytes) {
                    Ok(rows) => {
                        out.insert(*hash, rows);
                    }
                    Err(e) => {
                        tracing::warn!(hash = *hash, error = %e, "dropping malformed cache record");
                    }
                }
            }
        }

        out
    }

    /// Write-through population: stores every row for each hash with the
    /// configured TTL. All rows for a hash are written together — never
    /// partial. Failures are logged and swallowed.
    pub fn put_many(&self, rows: &HashMap<u64, Vec<(String, u32)>>, ttl: Option<Duration>) {
        if rows.is_empty() {
            return;
        }
        let Some(client) = &self.client else {
            return;
        };

        let mut conn = match self.open_connection(client) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "hash cache connection failed, skipping write-through");
                return;
            }
        };

        let ttl_secs = ttl.unwrap_or(self.default_ttl).as_secs().max(1);

        let mut pipe = redis::pipe();
        for (hash, group) in rows {
            pipe.set_ex(self.key(*hash), codec::encode(group), ttl_secs).ignore();
        }

        if let Err(e) = pipe.query::<()>(&mut conn) {
            tracing::warn!(error = %e, "hash cache write-through failed");
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.client.is_none()
    }
}
