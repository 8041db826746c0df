//! Reqwest-backed notification gateway adapter.
//!
//! The gateway accepts `POST {base}/messages` with a JSON body naming the
//! channel, recipient, template and parameters, and may answer with a
//! `{"reference": "..."}` acknowledgement.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::notification::{
    DeliveryReceipt, NotificationChannel, NotificationParams, NotificationTemplate,
};
use crate::domain::ports::{DeliveryError, Notifier};

const DEFAULT_USER_AGENT: &str = "neighbourly-notifier/0.1";
const PREVIEW_CHAR_LIMIT: usize = 160;

/// Outbound identity for gateway requests.
pub struct GatewayIdentity {
    pub user_agent: String,
    /// Bearer token sent in `Authorization`, when the gateway wants one.
    pub api_key: Option<String>,
}

impl Default for GatewayIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            api_key: None,
        }
    }
}

#[derive(Serialize)]
struct MessageRequest<'a> {
    channel: NotificationChannel,
    to: &'a str,
    template: NotificationTemplate,
    params: &'a NotificationParams,
}

#[derive(Deserialize, Default)]
struct MessageAck {
    reference: Option<String>,
}

/// Notifier that delivers through an HTTP gateway.
pub struct HttpNotificationGateway {
    client: Client,
    endpoint: Url,
    identity: GatewayIdentity,
}

impl HttpNotificationGateway {
    /// Build an adapter posting to `{base}/messages`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base` cannot be joined or the client cannot be
    /// constructed.
    pub fn new(
        base: &Url,
        timeout: Duration,
        identity: GatewayIdentity,
    ) -> Result<Self, GatewayBuildError> {
        let endpoint = messages_endpoint(base)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(identity.user_agent.clone())
            .build()
            .map_err(|err| GatewayBuildError(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            identity,
        })
    }
}

/// Failure to construct [`HttpNotificationGateway`].
#[derive(Debug, thiserror::Error)]
#[error("notification gateway misconfigured: {0}")]
pub struct GatewayBuildError(String);

fn messages_endpoint(base: &Url) -> Result<Url, GatewayBuildError> {
    let mut normalised = base.clone();
    if !normalised.path().ends_with('/') {
        let path = format!("{}/", normalised.path());
        normalised.set_path(&path);
    }
    normalised
        .join("messages")
        .map_err(|err| GatewayBuildError(err.to_string()))
}

#[async_trait]
impl Notifier for HttpNotificationGateway {
    async fn notify(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        template: NotificationTemplate,
        params: &NotificationParams,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&MessageRequest {
                channel,
                to: recipient,
                template,
                params,
            });
        if let Some(key) = &self.identity.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        let ack = parse_ack(body.as_ref());
        debug!(
            channel = channel.as_str(),
            template = template.as_str(),
            "notification accepted by gateway"
        );
        Ok(DeliveryReceipt {
            reference: ack.reference,
        })
    }
}

fn parse_ack(body: &[u8]) -> MessageAck {
    if body.iter().all(u8::is_ascii_whitespace) {
        return MessageAck::default();
    }
    serde_json::from_slice(body).unwrap_or_default()
}

fn map_transport_error(error: reqwest::Error) -> DeliveryError {
    DeliveryError::transport(error.to_string())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> DeliveryError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            DeliveryError::transport(message)
        }
        _ if status.is_client_error() => DeliveryError::rejected(message),
        _ => DeliveryError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://gateway.example.org", "https://gateway.example.org/messages")]
    #[case("https://gateway.example.org/v2", "https://gateway.example.org/v2/messages")]
    #[case("https://gateway.example.org/v2/", "https://gateway.example.org/v2/messages")]
    fn joins_messages_path(#[case] base: &str, #[case] expected: &str) {
        let base = Url::parse(base).expect("url");
        assert_eq!(messages_endpoint(&base).expect("join").as_str(), expected);
    }

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, true)]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, true)]
    #[case(StatusCode::TOO_MANY_REQUESTS, false)]
    #[case(StatusCode::BAD_GATEWAY, false)]
    fn classifies_statuses(#[case] status: StatusCode, #[case] rejected: bool) {
        let err = map_status_error(status, b"{\"error\": \"bad number\"}");
        assert_eq!(matches!(err, DeliveryError::Rejected { .. }), rejected);
        assert!(err.to_string().contains(&status.as_u16().to_string()));
    }

    #[rstest]
    #[case(b"".as_slice(), None)]
    #[case(b"not json".as_slice(), None)]
    #[case(br#"{"reference":"msg-1"}"#.as_slice(), Some("msg-1"))]
    fn reads_optional_reference(#[case] body: &[u8], #[case] expected: Option<&str>) {
        assert_eq!(parse_ack(body).reference.as_deref(), expected);
    }

    #[test]
    fn request_body_uses_wire_names() {
        let mut params = NotificationParams::new();
        params.insert("approval_url".to_owned(), "https://x/y".to_owned());
        let body = serde_json::to_value(MessageRequest {
            channel: NotificationChannel::Sms,
            to: "+447700900123",
            template: NotificationTemplate::BorrowVideoReady,
            params: &params,
        })
        .expect("serialise");
        assert_eq!(body["channel"], "sms");
        assert_eq!(body["template"], "borrow_video_ready");
        assert_eq!(body["params"]["approval_url"], "https://x/y");
    }
}
