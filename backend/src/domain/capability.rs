//! Stateless capability tokens.
//!
//! A capability token grants authority to its bearer without a session. The
//! wire form is `PREFIX:v<version>:<subject>:<sig>` where `sig` is the first
//! eight lowercase hex digits of `HMAC-SHA256(secret, subject:purpose:v<version>)`.
//! The purpose is bound into the MAC but not carried in the token, so a token
//! minted for one purpose never verifies for another.
//!
//! Tokens carry no expiry. Callers that need one pair the token with a stored
//! timestamp.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Development-only signing secret.
///
/// Debug builds fall back to this value when `CAPABILITY_SECRET` is unset.
/// Release builds refuse to start without an explicit secret, so tokens signed
/// with this constant are never valid in production.
pub const DEV_FALLBACK_SECRET: &str = "neighbourly-dev-capability-secret-do-not-deploy";

/// Version currently minted and accepted.
pub const CURRENT_VERSION: u32 = 1;

const SIGNATURE_HEX_LEN: usize = 8;
const FIELD_DELIMITER: char = ':';

/// Failures raised by the codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// The prefix is empty or not upper-case ASCII alphanumeric.
    #[error("capability prefix must be non-empty upper-case ASCII alphanumerics")]
    InvalidPrefix,
    /// The signing secret is empty.
    #[error("capability secret must not be empty")]
    EmptySecret,
    /// Subject or purpose is empty or contains the field delimiter.
    #[error("{field} must be non-empty and must not contain ':'")]
    InvalidField { field: &'static str },
    /// The token is malformed, forged, or minted for another purpose.
    #[error("capability token is invalid")]
    Invalid,
}

/// HMAC key material, wiped on drop.
#[derive(Clone)]
pub struct CapabilitySecret(Zeroizing<Vec<u8>>);

impl CapabilitySecret {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, CapabilityError> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.is_empty() {
            return Err(CapabilityError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    /// Secret for local development.
    #[must_use]
    pub fn development() -> Self {
        Self(Zeroizing::new(DEV_FALLBACK_SECRET.as_bytes().to_vec()))
    }

    /// Whether this secret is the development fallback.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.0.as_slice() == DEV_FALLBACK_SECRET.as_bytes()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for CapabilitySecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CapabilitySecret(..)")
    }
}

/// Issues and verifies capability tokens for one prefix.
///
/// # Examples
/// ```
/// use neighbourly::domain::{CapabilityCodec, CapabilitySecret};
///
/// let codec = CapabilityCodec::new("SLFB", CapabilitySecret::development()).unwrap();
/// let token = codec.issue("user_123", "feedback").unwrap();
/// assert!(token.starts_with("SLFB:v1:user_123:"));
/// assert_eq!(codec.verify(&token, "feedback").unwrap(), "user_123");
/// assert!(codec.verify(&token, "invite").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CapabilityCodec {
    prefix: String,
    secret: CapabilitySecret,
}

impl CapabilityCodec {
    /// Build a codec for `prefix`.
    pub fn new(prefix: impl Into<String>, secret: CapabilitySecret) -> Result<Self, CapabilityError> {
        let prefix = prefix.into();
        let valid = !prefix.is_empty()
            && prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !valid {
            return Err(CapabilityError::InvalidPrefix);
        }
        Ok(Self { prefix, secret })
    }

    /// Token prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mint a token binding `subject` to `purpose`.
    pub fn issue(&self, subject: &str, purpose: &str) -> Result<String, CapabilityError> {
        check_field(subject, "subject")?;
        check_field(purpose, "purpose")?;
        let signature = self.signature(subject, purpose, CURRENT_VERSION);
        Ok(format!(
            "{prefix}:v{CURRENT_VERSION}:{subject}:{signature}",
            prefix = self.prefix
        ))
    }

    /// Verify `token` for `purpose` and return its subject.
    ///
    /// Every structural deviation, unknown prefix or version, and signature
    /// mismatch collapses into [`CapabilityError::Invalid`].
    pub fn verify(&self, token: &str, purpose: &str) -> Result<String, CapabilityError> {
        check_field(purpose, "purpose")?;
        let fields: Vec<&str> = token.split(FIELD_DELIMITER).collect();
        let [prefix, version, subject, signature] = fields.as_slice() else {
            return Err(CapabilityError::Invalid);
        };
        if *prefix != self.prefix || subject.is_empty() || !is_signature_shape(signature) {
            return Err(CapabilityError::Invalid);
        }
        let version = parse_version(version).ok_or(CapabilityError::Invalid)?;
        let expected = self.signature(subject, purpose, version);
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Ok((*subject).to_owned())
        } else {
            Err(CapabilityError::Invalid)
        }
    }

    fn signature(&self, subject: &str, purpose: &str, version: u32) -> String {
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            // HMAC accepts keys of any length; `CapabilitySecret` is never empty.
            Err(_) => return String::new(),
        };
        mac.update(format!("{subject}:{purpose}:v{version}").as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        digest.chars().take(SIGNATURE_HEX_LEN).collect()
    }
}

fn check_field(value: &str, field: &'static str) -> Result<(), CapabilityError> {
    if value.is_empty() || value.contains(FIELD_DELIMITER) {
        return Err(CapabilityError::InvalidField { field });
    }
    Ok(())
}

fn is_signature_shape(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN
        && signature
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn parse_version(raw: &str) -> Option<u32> {
    let version: u32 = raw.strip_prefix('v')?.parse().ok()?;
    (version == CURRENT_VERSION).then_some(version)
}
