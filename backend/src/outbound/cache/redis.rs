//! Redis-backed TTL store.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::AsyncCommands as _;
use bb8_redis::{RedisConnectionManager, bb8};
use thiserror::Error;
use tracing::debug;

use crate::domain::ports::{EphemeralKey, EphemeralStore, EphemeralStoreError};

/// Failure while building the Redis pool.
#[derive(Debug, Error)]
pub enum RedisStoreError {
    #[error("invalid redis url: {message}")]
    InvalidUrl { message: String },
    #[error("failed to build redis pool: {message}")]
    Build { message: String },
}

/// [`EphemeralStore`] over a bb8 pool of Redis connections.
#[derive(Clone)]
pub struct RedisEphemeralStore {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisEphemeralStore {
    /// Connect to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RedisStoreError`] when the URL is invalid or the pool cannot
    /// be built.
    pub async fn connect(redis_url: &str) -> Result<Self, RedisStoreError> {
        let manager = RedisConnectionManager::new(redis_url).map_err(|err| {
            RedisStoreError::InvalidUrl {
                message: err.to_string(),
            }
        })?;
        let pool = bb8::Pool::builder()
            .build(manager)
            .await
            .map_err(|err| RedisStoreError::Build {
                message: err.to_string(),
            })?;
        Ok(Self { pool })
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    // Redis rejects EX 0.
    ttl.as_secs().max(1)
}

fn backend_error(err: impl std::fmt::Display) -> EphemeralStoreError {
    EphemeralStoreError::backend(err.to_string())
}

#[async_trait]
impl EphemeralStore for RedisEphemeralStore {
    async fn put(
        &self,
        key: &EphemeralKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), EphemeralStoreError> {
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        conn.set_ex::<_, _, ()>(key.as_str(), value, ttl_seconds(ttl))
            .await
            .map_err(backend_error)?;
        debug!(key = %key, "stored ephemeral entry");
        Ok(())
    }

    async fn get(&self, key: &EphemeralKey) -> Result<Option<String>, EphemeralStoreError> {
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        conn.get::<_, Option<String>>(key.as_str())
            .await
            .map_err(backend_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(200), 1)]
    #[case(Duration::from_secs(300), 300)]
    fn ttl_rounds_to_whole_seconds(#[case] ttl: Duration, #[case] expected: u64) {
        assert_eq!(ttl_seconds(ttl), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_invalid_urls() {
        let err = RedisEphemeralStore::connect("not a url")
            .await
            .err()
            .expect("invalid url");
        assert!(matches!(err, RedisStoreError::InvalidUrl { .. }));
    }
}
