//! Video provider webhook: signature verification and event decoding.
//!
//! The provider signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex>` where the digest is
//! `HMAC-SHA256(secret, "{t}." + body)`. Several `v1` entries may appear
//! while the provider rotates secrets; any one matching is enough.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Development-only webhook secret used when `VIDEO_WEBHOOK_SECRET` is unset
/// in debug builds.
pub const DEV_WEBHOOK_SECRET: &str = "neighbourly-dev-webhook-secret-do-not-deploy";

/// Default accepted clock skew between the provider and this service.
pub const DEFAULT_TOLERANCE_SECS: u32 = 300;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "mux-signature";

/// Why a delivery failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("signature header malformed")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies webhook signatures against a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Zeroizing<Vec<u8>>,
    tolerance: Duration,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, tolerance: Duration) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            tolerance,
        }
    }

    /// Verify `header` for `body` as received at `now`.
    pub fn verify(
        &self,
        header: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;
        let parsed = parse_header(header)?;
        let skew = now.timestamp().abs_diff(parsed.timestamp);
        if skew > self.tolerance.num_seconds().unsigned_abs() {
            return Err(SignatureError::Stale);
        }
        let expected = self.digest(parsed.timestamp, body);
        let matched = parsed
            .signatures
            .iter()
            .filter_map(|sig| hex::decode(sig).ok())
            .any(|candidate| bool::from(expected.as_slice().ct_eq(&candidate)));
        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Header value for `body` signed at `timestamp`.
    #[must_use]
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> String {
        format!("t={timestamp},v1={}", hex::encode(self.digest(timestamp, body)))
    }

    fn digest(&self, timestamp: i64, body: &[u8]) -> Vec<u8> {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return Vec::new();
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }
}

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::Malformed)?;
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?);
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }
    match (timestamp, signatures.is_empty()) {
        (Some(timestamp), false) => Ok(ParsedHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::Malformed),
    }
}

/// Event envelope; unknown event types decode to [`VideoEvent::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum VideoEvent {
    #[serde(rename = "video.asset.ready")]
    AssetReady { data: AssetReady },
    #[serde(other)]
    Other,
}

/// Payload of an asset-ready event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetReady {
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    /// Correlation value set at upload time: the borrow request id.
    #[serde(default)]
    pub passthrough: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackId {
    pub id: String,
}

impl AssetReady {
    /// First non-empty playback id.
    #[must_use]
    pub fn playback_id(&self) -> Option<&str> {
        self.playback_ids
            .iter()
            .map(|p| p.id.trim())
            .find(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    const BODY: &[u8] = br#"{"type":"video.asset.ready","data":{"playback_ids":[{"id":"abc"}],"passthrough":"x"}}"#;

    #[fixture]
    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(b"whsec-test".to_vec(), Duration::seconds(300))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().expect("instant")
    }

    #[rstest]
    fn accepts_fresh_signature(verifier: WebhookVerifier) {
        let header = verifier.sign(1_700_000_000, BODY);
        assert_eq!(verifier.verify(Some(&header), BODY, at(1_700_000_100)), Ok(()));
    }

    #[rstest]
    fn accepts_any_rotated_signature(verifier: WebhookVerifier) {
        let good = verifier.sign(1_700_000_000, BODY);
        let good_sig = good.split_once("v1=").map(|(_, s)| s).expect("sig");
        let header = format!("t=1700000000,v1={},v1={good_sig}", "00".repeat(32));
        assert_eq!(verifier.verify(Some(&header), BODY, at(1_700_000_000)), Ok(()));
    }

    #[rstest]
    fn rejects_tampered_body(verifier: WebhookVerifier) {
        let header = verifier.sign(1_700_000_000, BODY);
        assert_eq!(
            verifier.verify(Some(&header), b"{}", at(1_700_000_000)),
            Err(SignatureError::Mismatch)
        );
    }

    #[rstest]
    fn rejects_other_secret(verifier: WebhookVerifier) {
        let other = WebhookVerifier::new(b"another".to_vec(), Duration::seconds(300));
        let header = other.sign(1_700_000_000, BODY);
        assert_eq!(
            verifier.verify(Some(&header), BODY, at(1_700_000_000)),
            Err(SignatureError::Mismatch)
        );
    }

    #[rstest]
    fn rejects_stale_timestamp(verifier: WebhookVerifier) {
        let header = verifier.sign(1_700_000_000, BODY);
        assert_eq!(
            verifier.verify(Some(&header), BODY, at(1_700_000_301)),
            Err(SignatureError::Stale)
        );
    }

    #[rstest]
    #[case(None, SignatureError::Missing)]
    #[case(Some("v1=abcd"), SignatureError::Malformed)]
    #[case(Some("t=1700000000"), SignatureError::Malformed)]
    #[case(Some("t=soon,v1=abcd"), SignatureError::Malformed)]
    #[case(Some("garbage"), SignatureError::Malformed)]
    #[case(Some("t=-9223372036854775808,v1=00"), SignatureError::Stale)]
    #[case(Some("t=9223372036854775807,v1=00"), SignatureError::Stale)]
    fn rejects_bad_headers(
        verifier: WebhookVerifier,
        #[case] header: Option<&str>,
        #[case] expected: SignatureError,
    ) {
        assert_eq!(verifier.verify(header, BODY, at(1_700_000_000)), Err(expected));
    }

    #[test]
    fn decodes_asset_ready() {
        let event: VideoEvent = serde_json::from_slice(BODY).expect("decode");
        let VideoEvent::AssetReady { data } = event else {
            panic!("expected asset ready");
        };
        assert_eq!(data.playback_id(), Some("abc"));
        assert_eq!(data.passthrough.as_deref(), Some("x"));
    }

    #[test]
    fn unknown_events_are_other() {
        let event: VideoEvent =
            serde_json::from_str(r#"{"type":"video.asset.created","data":{"id":"1"}}"#)
                .expect("decode");
        assert_eq!(event, VideoEvent::Other);
    }

    #[test]
    fn blank_playback_ids_are_skipped() {
        let data = AssetReady {
            playback_ids: vec![PlaybackId { id: " ".into() }, PlaybackId { id: "p2".into() }],
            passthrough: None,
        };
        assert_eq!(data.playback_id(), Some("p2"));
    }
}
