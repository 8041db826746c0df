//! Process-local TTL store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::{EphemeralKey, EphemeralStore, EphemeralStoreError};

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory [`EphemeralStore`] driven by an injectable clock.
pub struct MemoryEphemeralStore {
    entries: Mutex<HashMap<EphemeralKey, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryEphemeralStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EphemeralKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EphemeralStore for MemoryEphemeralStore {
    async fn put(
        &self,
        key: &EphemeralKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), EphemeralStoreError> {
        let ttl = TimeDelta::from_std(ttl)
            .map_err(|err| EphemeralStoreError::backend(format!("ttl out of range: {err}")))?;
        let now = self.clock.utc();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| EphemeralStoreError::backend("ttl out of range"))?;
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.clone(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &EphemeralKey) -> Result<Option<String>, EphemeralStoreError> {
        let now = self.clock.utc();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MutableClock;
    use chrono::TimeZone;
    use rstest::rstest;

    fn store() -> (Arc<MutableClock>, MemoryEphemeralStore) {
        let clock = Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).single().expect("instant"),
        ));
        let store = MemoryEphemeralStore::new(clock.clone());
        (clock, store)
    }

    #[rstest]
    #[tokio::test]
    async fn entries_vanish_after_ttl() {
        let (clock, store) = store();
        let key = EphemeralKey::new("generation-result:abc").expect("key");
        store
            .put(&key, "{}", Duration::from_secs(60))
            .await
            .expect("put");

        clock.advance(Duration::from_secs(59));
        assert_eq!(store.get(&key).await.expect("get"), Some("{}".to_owned()));

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get(&key).await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn put_overwrites_and_refreshes_ttl() {
        let (clock, store) = store();
        let key = EphemeralKey::new("k").expect("key");
        store.put(&key, "a", Duration::from_secs(10)).await.expect("put");
        clock.advance(Duration::from_secs(8));
        store.put(&key, "b", Duration::from_secs(10)).await.expect("put");
        clock.advance(Duration::from_secs(8));
        assert_eq!(store.get(&key).await.expect("get"), Some("b".to_owned()));
    }

    #[rstest]
    #[tokio::test]
    async fn ttl_past_the_calendar_is_refused() {
        let (_, store) = store();
        let key = EphemeralKey::new("k").expect("key");
        let result = store
            .put(&key, "a", Duration::from_secs(9_000_000_000_000))
            .await;
        assert!(result.is_err());
        assert_eq!(store.get(&key).await.expect("get"), None);
    }
}
