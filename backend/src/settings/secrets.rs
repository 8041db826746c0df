//! Signing material read from the environment.
//!
//! | Variable | Used for |
//! | --- | --- |
//! | `SESSION_KEY_FILE` | cookie session key (file path) |
//! | `SESSION_ALLOW_EPHEMERAL` | debug-only random session key |
//! | `CAPABILITY_SECRET` | capability tokens and invite cookies |
//! | `VIDEO_WEBHOOK_SECRET` | video provider signatures |
//! | `NOTIFICATION_GATEWAY_TOKEN` | bearer token for the gateway (optional) |
//!
//! Debug builds fall back to development values with a warning. Release
//! builds refuse to start on anything missing or shorter than
//! [`SECRET_MIN_LEN`].

use std::path::PathBuf;

use actix_web::cookie::Key;
use mockable::Env;
use sha2::{Digest, Sha256};
use tracing::warn;
use zeroize::{Zeroize, Zeroizing};

use crate::domain::video_webhook::DEV_WEBHOOK_SECRET;
use crate::domain::{CapabilityError, CapabilitySecret};

/// Shortest secret accepted in release builds.
pub const SECRET_MIN_LEN: usize = 32;

const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const KEY_FILE_ENV: &str = "SESSION_KEY_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "SESSION_ALLOW_EPHEMERAL";
const CAPABILITY_SECRET_ENV: &str = "CAPABILITY_SECRET";
const WEBHOOK_SECRET_ENV: &str = "VIDEO_WEBHOOK_SECRET";
const GATEWAY_TOKEN_ENV: &str = "NOTIFICATION_GATEWAY_TOKEN";
const FINGERPRINT_BYTES: usize = 8;

/// Build mode deciding whether development fallbacks are allowed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    /// Mode of the current binary.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Loaded signing material.
pub struct Secrets {
    pub session_key: Key,
    pub capability: CapabilitySecret,
    pub webhook: Zeroizing<Vec<u8>>,
    pub gateway_token: Option<Zeroizing<String>>,
}

impl Secrets {
    /// Short fingerprints safe to log, for checking which keys are live.
    #[must_use]
    pub fn fingerprints(&self) -> SecretFingerprints {
        SecretFingerprints {
            session_key: fingerprint(self.session_key.signing()),
            webhook: fingerprint(&self.webhook),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFingerprints {
    pub session_key: String,
    pub webhook: String,
}

/// Secret loading failures.
#[derive(thiserror::Error, Debug)]
pub enum SecretsError {
    #[error("missing required environment variable: {name}")]
    Missing { name: &'static str },
    #[error("{name} too short: need >= {min_len} bytes, got {length}")]
    TooShort {
        name: &'static str,
        length: usize,
        min_len: usize,
    },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SESSION_ALLOW_EPHEMERAL must be 0 in release builds")]
    EphemeralNotAllowed,
    #[error("invalid capability secret: {0}")]
    Capability(#[from] CapabilityError),
}

/// Load every secret for `mode`.
///
/// # Examples
///
/// ```rust
/// use mockable::MockEnv;
/// use neighbourly::settings::{BuildMode, secrets_from_env};
///
/// let mut env = MockEnv::new();
/// env.expect_string().returning(|_| None);
/// let secrets = secrets_from_env(&env, BuildMode::Debug).expect("debug fallbacks");
/// assert!(secrets.capability.is_development());
/// ```
pub fn secrets_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<Secrets, SecretsError> {
    let allow_ephemeral = allow_ephemeral_from_env(env, mode)?;
    let session_key = session_key_from_env(env, mode, allow_ephemeral)?;
    let capability = match required_secret(env, mode, CAPABILITY_SECRET_ENV)? {
        Some(bytes) => CapabilitySecret::new(bytes.to_vec())?,
        None => CapabilitySecret::development(),
    };
    let webhook = required_secret(env, mode, WEBHOOK_SECRET_ENV)?
        .unwrap_or_else(|| Zeroizing::new(DEV_WEBHOOK_SECRET.as_bytes().to_vec()));
    let gateway_token = env
        .string(GATEWAY_TOKEN_ENV)
        .filter(|token| !token.trim().is_empty())
        .map(Zeroizing::new);

    Ok(Secrets {
        session_key,
        capability,
        webhook,
        gateway_token,
    })
}

/// `Some(bytes)` when set and long enough; `None` means use the development
/// fallback, which only debug builds get.
fn required_secret<E: Env>(
    env: &E,
    mode: BuildMode,
    name: &'static str,
) -> Result<Option<Zeroizing<Vec<u8>>>, SecretsError> {
    let Some(value) = env.string(name).map(Zeroizing::new) else {
        if mode.is_debug() {
            warn!(name, "secret not set; using development fallback");
            return Ok(None);
        }
        return Err(SecretsError::Missing { name });
    };
    let length = value.len();
    if length < SECRET_MIN_LEN {
        if mode.is_debug() {
            warn!(name, length, "secret shorter than release minimum");
        } else {
            return Err(SecretsError::TooShort {
                name,
                length,
                min_len: SECRET_MIN_LEN,
            });
        }
    }
    if length == 0 {
        return Ok(None);
    }
    Ok(Some(Zeroizing::new(value.as_bytes().to_vec())))
}

fn allow_ephemeral_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<bool, SecretsError> {
    let allowed = env
        .string(ALLOW_EPHEMERAL_ENV)
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    if allowed && !mode.is_debug() {
        return Err(SecretsError::EphemeralNotAllowed);
    }
    Ok(allowed)
}

fn session_key_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
    allow_ephemeral: bool,
) -> Result<Key, SecretsError> {
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| SESSION_KEY_DEFAULT_PATH.to_owned()),
    );

    match std::fs::read(&path) {
        // `Key::derive_from` panics below 32 bytes.
        Ok(mut bytes) if bytes.len() >= SECRET_MIN_LEN => {
            let key = Key::derive_from(&bytes);
            bytes.zeroize();
            Ok(key)
        }
        Ok(mut bytes) => {
            let length = bytes.len();
            bytes.zeroize();
            if mode.is_debug() || allow_ephemeral {
                warn!(path = %path.display(), length, "session key too short; using temporary key (dev only)");
                return Ok(Key::generate());
            }
            Err(SecretsError::TooShort {
                name: KEY_FILE_ENV,
                length,
                min_len: SECRET_MIN_LEN,
            })
        }
        Err(error) => {
            if mode.is_debug() || allow_ephemeral {
                warn!(path = %path.display(), %error, "using temporary session key (dev only)");
                return Ok(Key::generate());
            }
            Err(SecretsError::KeyRead {
                path,
                source: error,
            })
        }
    }
}

fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::io::Write as _;

    const LONG: &str = "0123456789abcdef0123456789abcdef";

    fn key_file(len: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&vec![b'k'; len]).expect("write key");
        file
    }

    fn mock_env(vars: &[(&str, &str)]) -> MockEnv {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let mut env = MockEnv::new();
        env.expect_string()
            .times(0..)
            .returning(move |key| vars.get(key).cloned());
        env
    }

    fn expect_error(result: Result<Secrets, SecretsError>) -> SecretsError {
        match result {
            Ok(_) => panic!("expected secrets to be rejected"),
            Err(error) => error,
        }
    }

    #[rstest]
    fn release_accepts_complete_configuration() {
        let key = key_file(64);
        let path = key.path().to_string_lossy().into_owned();
        let env = mock_env(&[
            (KEY_FILE_ENV, &path),
            (CAPABILITY_SECRET_ENV, LONG),
            (WEBHOOK_SECRET_ENV, LONG),
        ]);
        let secrets = secrets_from_env(&env, BuildMode::Release).expect("secrets");
        assert!(!secrets.capability.is_development());
        assert_eq!(secrets.webhook.as_slice(), LONG.as_bytes());
        assert!(secrets.gateway_token.is_none());
        assert_eq!(secrets.fingerprints().webhook.len(), 16);
    }

    #[rstest]
    #[case(CAPABILITY_SECRET_ENV)]
    #[case(WEBHOOK_SECRET_ENV)]
    fn release_requires_each_secret(#[case] missing: &str) {
        let key = key_file(64);
        let path = key.path().to_string_lossy().into_owned();
        let vars: Vec<(&str, &str)> = [
            (KEY_FILE_ENV, path.as_str()),
            (CAPABILITY_SECRET_ENV, LONG),
            (WEBHOOK_SECRET_ENV, LONG),
        ]
        .into_iter()
        .filter(|(name, _)| *name != missing)
        .collect();
        let err = expect_error(secrets_from_env(&mock_env(&vars), BuildMode::Release));
        assert!(matches!(err, SecretsError::Missing { name } if name == missing));
    }

    #[rstest]
    fn release_rejects_short_secret() {
        let key = key_file(64);
        let path = key.path().to_string_lossy().into_owned();
        let env = mock_env(&[
            (KEY_FILE_ENV, &path),
            (CAPABILITY_SECRET_ENV, "short"),
            (WEBHOOK_SECRET_ENV, LONG),
        ]);
        let err = expect_error(secrets_from_env(&env, BuildMode::Release));
        assert!(matches!(
            err,
            SecretsError::TooShort {
                name: CAPABILITY_SECRET_ENV,
                length: 5,
                ..
            }
        ));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(8))]
    fn release_rejects_unusable_session_key(#[case] key_len: Option<usize>) {
        let key = key_len.map(key_file);
        let path = key.as_ref().map_or_else(
            || "/nonexistent/session_key".to_owned(),
            |file| file.path().to_string_lossy().into_owned(),
        );
        let env = mock_env(&[
            (KEY_FILE_ENV, &path),
            (CAPABILITY_SECRET_ENV, LONG),
            (WEBHOOK_SECRET_ENV, LONG),
        ]);
        let err = expect_error(secrets_from_env(&env, BuildMode::Release));
        assert!(matches!(
            err,
            SecretsError::KeyRead { .. } | SecretsError::TooShort { name: KEY_FILE_ENV, .. }
        ));
    }

    #[rstest]
    fn release_refuses_ephemeral_keys() {
        let env = mock_env(&[(ALLOW_EPHEMERAL_ENV, "1")]);
        let err = expect_error(secrets_from_env(&env, BuildMode::Release));
        assert!(matches!(err, SecretsError::EphemeralNotAllowed));
    }

    #[rstest]
    fn debug_falls_back_to_development_values() {
        let env = mock_env(&[(KEY_FILE_ENV, "/nonexistent/session_key")]);
        let secrets = secrets_from_env(&env, BuildMode::Debug).expect("debug fallbacks");
        assert!(secrets.capability.is_development());
        assert_eq!(secrets.webhook.as_slice(), DEV_WEBHOOK_SECRET.as_bytes());
    }

    #[rstest]
    fn gateway_token_is_optional_and_trimmed_when_blank() {
        let env = mock_env(&[
            (KEY_FILE_ENV, "/nonexistent/session_key"),
            (GATEWAY_TOKEN_ENV, "  "),
        ]);
        let secrets = secrets_from_env(&env, BuildMode::Debug).expect("secrets");
        assert!(secrets.gateway_token.is_none());
    }
}
