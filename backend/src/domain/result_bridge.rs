//! Bridges asynchronous generation results to the client polling for them.
//!
//! A worker publishes a result under the opaque id the client was given; the
//! client polls until it appears or the entry lapses. Results are transient.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::Error;
use super::ports::{EphemeralKey, EphemeralStore, EphemeralStoreError};

/// Default lifetime of a published result.
pub const DEFAULT_RESULT_TTL_SECS: u64 = 300;

const KEY_NAMESPACE: &str = "generation-result";
const MAX_ID_LEN: usize = 128;

fn map_store_error(error: EphemeralStoreError) -> Error {
    match error {
        EphemeralStoreError::Backend { message } => {
            Error::service_unavailable(format!("result store unavailable: {message}"))
        }
    }
}

fn key_for(id: &str) -> Result<EphemeralKey, Error> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(Error::invalid_request("generation id is malformed"));
    }
    EphemeralKey::new(format!("{KEY_NAMESPACE}:{id}"))
        .map_err(|err| Error::invalid_request(err.to_string()))
}

/// Publishes and polls generation results.
#[derive(Clone)]
pub struct GenerationResultBridge {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl GenerationResultBridge {
    pub fn new(store: Arc<dyn EphemeralStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Make `result` available to pollers of `id` until the TTL lapses.
    pub async fn publish(&self, id: &str, result: &Value) -> Result<(), Error> {
        let key = key_for(id)?;
        let body = serde_json::to_string(result)
            .map_err(|err| Error::internal(format!("result encoding failed: {err}")))?;
        self.store
            .put(&key, &body, self.ttl)
            .await
            .map_err(map_store_error)?;
        debug!(%key, "generation result published");
        Ok(())
    }

    /// Current result for `id`, if published and still live.
    pub async fn poll(&self, id: &str) -> Result<Option<Value>, Error> {
        let key = key_for(id)?;
        let Some(raw) = self.store.get(&key).await.map_err(map_store_error)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(%key, error = %err, "discarding undecodable generation result");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockEphemeralStore;
    use mockall::predicate::always;
    use rstest::rstest;
    use serde_json::json;

    #[tokio::test]
    async fn publish_namespaces_key_and_applies_ttl() {
        let mut store = MockEphemeralStore::new();
        store
            .expect_put()
            .withf(|key, value, ttl| {
                key.as_str() == "generation-result:job-1"
                    && value == r#"{"url":"https://img.example/1.png"}"#
                    && *ttl == Duration::from_secs(60)
            })
            .times(1)
            .return_once(|_, _, _| Ok(()));

        GenerationResultBridge::new(Arc::new(store), Duration::from_secs(60))
            .publish("job-1", &json!({"url": "https://img.example/1.png"}))
            .await
            .expect("published");
    }

    #[tokio::test]
    async fn poll_decodes_live_entry() {
        let mut store = MockEphemeralStore::new();
        store
            .expect_get()
            .with(always())
            .return_once(|_| Ok(Some(r#"{"ready":true}"#.to_owned())));

        let value = GenerationResultBridge::new(Arc::new(store), Duration::from_secs(60))
            .poll("job-1")
            .await
            .expect("poll");
        assert_eq!(value, Some(json!({"ready": true})));
    }

    #[tokio::test]
    async fn poll_treats_garbage_as_absent() {
        let mut store = MockEphemeralStore::new();
        store
            .expect_get()
            .return_once(|_| Ok(Some("not json".to_owned())));

        let value = GenerationResultBridge::new(Arc::new(store), Duration::from_secs(60))
            .poll("job-1")
            .await
            .expect("poll");
        assert_eq!(value, None);
    }

    #[rstest]
    #[case("")]
    #[case("../etc")]
    #[case("a b")]
    #[tokio::test]
    async fn malformed_ids_are_rejected(#[case] id: &str) {
        let mut store = MockEphemeralStore::new();
        store.expect_get().never();
        let err = GenerationResultBridge::new(Arc::new(store), Duration::from_secs(60))
            .poll(id)
            .await
            .expect_err("malformed");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn backend_failure_is_unavailable() {
        let mut store = MockEphemeralStore::new();
        store
            .expect_get()
            .return_once(|_| Err(EphemeralStoreError::backend("timeout")));
        let err = GenerationResultBridge::new(Arc::new(store), Duration::from_secs(60))
            .poll("job-1")
            .await
            .expect_err("backend");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
