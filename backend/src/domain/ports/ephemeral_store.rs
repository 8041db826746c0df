//! Short-lived key-value storage with an explicit TTL contract.
//!
//! Entries must become invisible to `get` once their TTL elapses. Adapters may
//! evict lazily. Nothing stored here is durable.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::define_port_error;

const MAX_KEY_LEN: usize = 200;

/// Namespaced store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EphemeralKey(String);

impl EphemeralKey {
    /// Validate a key: non-empty, bounded, printable ASCII without spaces.
    pub fn new(value: impl Into<String>) -> Result<Self, EphemeralKeyValidationError> {
        let raw = value.into();
        if raw.is_empty() {
            return Err(EphemeralKeyValidationError::Empty);
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(EphemeralKeyValidationError::TooLong { max: MAX_KEY_LEN });
        }
        if !raw.chars().all(|c| c.is_ascii_graphic()) {
            return Err(EphemeralKeyValidationError::InvalidCharacter);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for EphemeralKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors returned when constructing [`EphemeralKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EphemeralKeyValidationError {
    #[error("ephemeral key must not be empty")]
    Empty,
    #[error("ephemeral key must be at most {max} bytes")]
    TooLong { max: usize },
    #[error("ephemeral key must be printable ASCII without whitespace")]
    InvalidCharacter,
}

define_port_error! {
    /// Errors surfaced by ephemeral store adapters.
    pub enum EphemeralStoreError {
        /// Backend is unavailable or timing out.
        Backend { message: String } => "ephemeral store backend failure: {message}",
    }
}

/// Port for TTL-bound key-value storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry.
    async fn put(
        &self,
        key: &EphemeralKey,
        value: &str,
        ttl: Duration,
    ) -> Result<(), EphemeralStoreError>;

    /// Read a live entry.
    async fn get(&self, key: &EphemeralKey) -> Result<Option<String>, EphemeralStoreError>;
}

#[cfg(test)]
mod tests {
    use super::{EphemeralKey, EphemeralKeyValidationError};
    use rstest::rstest;

    #[rstest]
    #[case("", EphemeralKeyValidationError::Empty)]
    #[case("has space", EphemeralKeyValidationError::InvalidCharacter)]
    #[case(" lead", EphemeralKeyValidationError::InvalidCharacter)]
    fn rejects_bad_keys(#[case] raw: &str, #[case] expected: EphemeralKeyValidationError) {
        assert_eq!(EphemeralKey::new(raw), Err(expected));
    }

    #[test]
    fn rejects_oversized_keys() {
        let err = EphemeralKey::new("k".repeat(201)).expect_err("too long");
        assert_eq!(err, EphemeralKeyValidationError::TooLong { max: 200 });
    }

    #[test]
    fn accepts_namespaced_keys() {
        let key = EphemeralKey::new("generation-result:abc-123").expect("valid");
        assert_eq!(key.to_string(), "generation-result:abc-123");
    }
}
