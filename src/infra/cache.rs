//! Redis cache: rate-limit counters and per-user permission sets.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::health::HealthProbe;
use crate::config::{Config, CACHE_PREFIX_PERMISSIONS, CACHE_PREFIX_RATE_LIMIT};
use crate::errors::{AppError, AppResult};
use domain::PermissionSet;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Storage for resolved permission sets, keyed by user.
///
/// Entries expire after `ttl_seconds` and are dropped eagerly whenever the
/// user's roles or a held role's permissions change.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn get_permissions(&self, user_id: Uuid) -> AppResult<Option<PermissionSet>>;

    async fn set_permissions(&self, user_id: Uuid, permissions: &PermissionSet, ttl_seconds: u64) -> AppResult<()>;

    async fn invalidate_permissions(&self, user_ids: &[Uuid]) -> AppResult<()>;
}

/// Fixed-window request counter.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request for `identifier`. Returns (current_count, is_allowed).
    async fn check_rate_limit(&self, identifier: &str, max_requests: u64, window_seconds: u64) -> AppResult<(u64, bool)>;
}

/// Redis cache wrapper with connection pooling.
#[derive(Clone)]
pub struct Cache {
    connection: ConnectionManager,
}

impl Cache {
    /// Connect to Redis.
    pub async fn connect(config: &Config) -> Result<Self, RedisError> {
        let client = Client::open(config.redis_url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        tracing::info!("Redis cache connected");

        Ok(Self { connection })
    }

    // =========================================================================
    // Generic Cache Operations
    // =========================================================================

    /// Get a value from cache.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| {
                    AppError::internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache with custom TTL (in seconds).
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(value)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;

        conn.set_ex::<_, _, ()>(key, json, ttl_seconds)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    /// Delete keys from cache.
    pub async fn delete(&self, keys: &[String]) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let _: () = conn.del(keys).await.map_err(cache_error)?;
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for Cache {
    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

#[async_trait]
impl RateLimiter for Cache {
    async fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> AppResult<(u64, bool)> {
        let key = rate_limit_key(identifier);
        let mut conn = self.connection.clone();

        // INCR creates the key at 1; the first hit of a window arms the expiry.
        let count: u64 = conn.incr(&key, 1u64).await.map_err(cache_error)?;
        if count == 1 {
            let _: () = conn
                .expire(&key, window_seconds as i64)
                .await
                .map_err(cache_error)?;
        }

        Ok((count, count <= max_requests))
    }
}

#[async_trait]
impl PermissionCache for Cache {
    async fn get_permissions(&self, user_id: Uuid) -> AppResult<Option<PermissionSet>> {
        self.get(&permissions_key(user_id)).await
    }

    async fn set_permissions(&self, user_id: Uuid, permissions: &PermissionSet, ttl_seconds: u64) -> AppResult<()> {
        self.set_with_ttl(&permissions_key(user_id), permissions, ttl_seconds)
            .await
    }

    async fn invalidate_permissions(&self, user_ids: &[Uuid]) -> AppResult<()> {
        let keys: Vec<String> = user_ids.iter().copied().map(permissions_key).collect();
        self.delete(&keys).await
    }
}

fn permissions_key(user_id: Uuid) -> String {
    format!("{}{}", CACHE_PREFIX_PERMISSIONS, user_id)
}

fn rate_limit_key(identifier: &str) -> String {
    format!("{}{}", CACHE_PREFIX_RATE_LIMIT, identifier)
}

/// Convert Redis error to AppError.
fn cache_error(e: RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            permissions_key(id),
            "permissions:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(rate_limit_key("auth:10.0.0.1"), "rate_limit:auth:10.0.0.1");
    }
}
