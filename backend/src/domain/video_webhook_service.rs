//! Reconciles video-ready webhook deliveries into borrow requests.
//!
//! Deliveries are at-least-once. The handler never reports failure to the
//! sender; each outcome is logged as a [`WebhookAck`] instead.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::borrow_service::{BorrowService, VideoAttachment};
use super::video_webhook::{VideoEvent, WebhookVerifier};
use super::{Error, ErrorCode};

/// Default playback host for HLS streams.
pub const DEFAULT_PLAYBACK_BASE_URL: &str = "https://stream.mux.com";

/// Internal outcome of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    /// A first-time attachment; the lender was notified.
    Applied,
    /// The request is still pending; the URL waits for approval.
    Buffered,
    /// Same URL already recorded.
    Duplicate,
    /// Event type carries no action.
    Ignored,
    /// Signature verification failed.
    Unverified,
    /// Body or asset data could not be decoded.
    Malformed,
    /// No borrow request matches the passthrough.
    Unmatched,
    /// The request no longer accepts a video, or storage failed.
    Rejected,
}

impl WebhookAck {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Buffered => "buffered",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Unverified => "unverified",
            Self::Malformed => "malformed",
            Self::Unmatched => "unmatched",
            Self::Rejected => "rejected",
        }
    }
}

/// Video-ready webhook handler.
#[derive(Clone)]
pub struct VideoWebhookService {
    verifier: WebhookVerifier,
    borrows: Arc<BorrowService>,
    clock: Arc<dyn Clock>,
    playback_base: String,
}

impl VideoWebhookService {
    pub fn new(
        verifier: WebhookVerifier,
        borrows: Arc<BorrowService>,
        clock: Arc<dyn Clock>,
        playback_base: impl Into<String>,
    ) -> Self {
        Self {
            verifier,
            borrows,
            clock,
            playback_base: playback_base.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Handle one delivery.
    pub async fn on_video_ready(&self, signature: Option<&str>, raw: &[u8]) -> WebhookAck {
        let ack = self.process(signature, raw).await;
        info!(ack = ack.as_str(), "video webhook processed");
        ack
    }

    async fn process(&self, signature: Option<&str>, raw: &[u8]) -> WebhookAck {
        if let Err(reason) = self.verifier.verify(signature, raw, self.clock.utc()) {
            warn!(%reason, "video webhook failed verification");
            return WebhookAck::Unverified;
        }
        let event: VideoEvent = match serde_json::from_slice(raw) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "video webhook body could not be decoded");
                return WebhookAck::Malformed;
            }
        };
        let data = match event {
            VideoEvent::AssetReady { data } => data,
            VideoEvent::Other => return WebhookAck::Ignored,
        };
        let Some(playback_id) = data.playback_id() else {
            warn!("asset ready event without a playback id");
            return WebhookAck::Malformed;
        };
        let Some(request_id) = data
            .passthrough
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        else {
            debug!("asset ready event without a borrow request passthrough");
            return WebhookAck::Unmatched;
        };

        let url = format!("{}/{playback_id}.m3u8", self.playback_base);
        match self.borrows.attach_video(&request_id, &url).await {
            Ok(VideoAttachment::Attached(outcome)) => {
                if !outcome.warnings.is_empty() {
                    warn!(%request_id, "video ready notification was not delivered");
                }
                WebhookAck::Applied
            }
            Ok(VideoAttachment::Replaced(_)) => WebhookAck::Applied,
            Ok(VideoAttachment::Buffered(_)) => WebhookAck::Buffered,
            Ok(VideoAttachment::Unchanged(_)) => WebhookAck::Duplicate,
            Err(err) => classify(&request_id, &err),
        }
    }
}

fn classify(request_id: &Uuid, err: &Error) -> WebhookAck {
    match err.code() {
        ErrorCode::NotFound => WebhookAck::Unmatched,
        ErrorCode::Conflict | ErrorCode::AlreadyResolved => {
            info!(%request_id, code = err.code().as_str(), "video webhook rejected by request state");
            WebhookAck::Rejected
        }
        _ => {
            error!(%request_id, error = %err, "video webhook could not be applied");
            WebhookAck::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::borrow_service::BorrowServicePorts;
    use crate::domain::notification::DeliveryReceipt;
    use crate::domain::ports::{
        MockBorrowRequestRepository, MockItemDirectory, MockNotifier, MockUserDirectory,
    };
    use crate::domain::{
        BorrowRequest, BorrowRequestDraft, BorrowStatus, PublicLinks, UserContact, UserId,
    };
    use crate::test_support::MutableClock;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use rstest::rstest;

    fn clock() -> Arc<MutableClock> {
        Arc::new(MutableClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).single().expect("instant"),
        ))
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(b"whsec-test".to_vec(), Duration::seconds(300))
    }

    fn request(status: BorrowStatus) -> BorrowRequest {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).expect("date");
        let draft = BorrowRequestDraft::new(Uuid::new_v4(), UserId::random(), "", today, today)
            .expect("draft");
        let mut request = BorrowRequest::open(draft, UserId::random(), Utc::now());
        request.status = status;
        request
    }

    fn service(requests: MockBorrowRequestRepository, notifier: MockNotifier) -> VideoWebhookService {
        let clock = clock();
        let mut users = MockUserDirectory::new();
        users.expect_find_contact().returning(|id| {
            Ok(Some(UserContact {
                user_id: *id,
                display_name: "Lender".to_owned(),
                email: None,
                phone: Some("+447700900123".to_owned()),
            }))
        });
        let borrows = BorrowService::new(
            BorrowServicePorts {
                requests: Arc::new(requests),
                items: Arc::new(MockItemDirectory::new()),
                users: Arc::new(users),
                notifier: Arc::new(notifier),
                clock: clock.clone(),
            },
            PublicLinks::new("https://lend.example.org").expect("links"),
        );
        VideoWebhookService::new(verifier(), Arc::new(borrows), clock, DEFAULT_PLAYBACK_BASE_URL)
    }

    fn signed(body: &str) -> String {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).single().expect("instant");
        verifier().sign(now.timestamp(), body.as_bytes())
    }

    fn ready_body(passthrough: &str) -> String {
        format!(
            r#"{{"type":"video.asset.ready","data":{{"playback_ids":[{{"id":"pb1"}}],"passthrough":"{passthrough}"}}}}"#
        )
    }

    #[tokio::test]
    async fn first_delivery_attaches_and_notifies_once() {
        let approved = request(BorrowStatus::Approved);
        let id = approved.id;
        let mut requests = MockBorrowRequestRepository::new();
        let current = approved.clone();
        requests
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(current)));
        requests
            .expect_attach_video()
            .withf(|_, url| url == "https://stream.mux.com/pb1.m3u8")
            .times(1)
            .return_once(move |_, url| {
                let mut updated = approved;
                updated.video_url = Some(url.to_owned());
                Ok(Some(updated))
            });
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .return_once(|_, _, _, _| Ok(DeliveryReceipt::default()));

        let body = ready_body(&id.to_string());
        let ack = service(requests, notifier)
            .on_video_ready(Some(&signed(&body)), body.as_bytes())
            .await;
        assert_eq!(ack, WebhookAck::Applied);
    }

    #[tokio::test]
    async fn redelivery_is_a_duplicate() {
        let mut approved = request(BorrowStatus::Approved);
        approved.video_url = Some("https://stream.mux.com/pb1.m3u8".to_owned());
        let id = approved.id;
        let mut requests = MockBorrowRequestRepository::new();
        requests
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(approved)));
        requests.expect_attach_video().never();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        let body = ready_body(&id.to_string());
        let ack = service(requests, notifier)
            .on_video_ready(Some(&signed(&body)), body.as_bytes())
            .await;
        assert_eq!(ack, WebhookAck::Duplicate);
    }

    #[tokio::test]
    async fn unverified_delivery_touches_nothing() {
        let mut requests = MockBorrowRequestRepository::new();
        requests.expect_find_by_id().never();
        let body = ready_body(&Uuid::new_v4().to_string());
        let ack = service(requests, MockNotifier::new())
            .on_video_ready(Some("t=1,v1=00"), body.as_bytes())
            .await;
        assert_eq!(ack, WebhookAck::Unverified);
    }

    #[rstest]
    #[case(r#"{"type":"video.asset.created","data":{}}"#, WebhookAck::Ignored)]
    #[case(r#"{"data":{}}"#, WebhookAck::Malformed)]
    #[case(r#"{"type":"video.asset.ready","data":{"playback_ids":[]}}"#, WebhookAck::Malformed)]
    #[case(
        r#"{"type":"video.asset.ready","data":{"playback_ids":[{"id":"p"}],"passthrough":"nope"}}"#,
        WebhookAck::Unmatched
    )]
    #[tokio::test]
    async fn non_actionable_events(#[case] body: &str, #[case] expected: WebhookAck) {
        let mut requests = MockBorrowRequestRepository::new();
        requests.expect_find_by_id().never();
        let ack = service(requests, MockNotifier::new())
            .on_video_ready(Some(&signed(body)), body.as_bytes())
            .await;
        assert_eq!(ack, expected);
    }

    #[tokio::test]
    async fn unknown_request_is_unmatched() {
        let mut requests = MockBorrowRequestRepository::new();
        requests.expect_find_by_id().return_once(|_| Ok(None));
        let body = ready_body(&Uuid::new_v4().to_string());
        let ack = service(requests, MockNotifier::new())
            .on_video_ready(Some(&signed(&body)), body.as_bytes())
            .await;
        assert_eq!(ack, WebhookAck::Unmatched);
    }

    #[tokio::test]
    async fn returned_request_rejects_video() {
        let returned = request(BorrowStatus::Returned);
        let id = returned.id;
        let mut requests = MockBorrowRequestRepository::new();
        requests
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(returned)));
        requests.expect_attach_video().never();
        let body = ready_body(&id.to_string());
        let ack = service(requests, MockNotifier::new())
            .on_video_ready(Some(&signed(&body)), body.as_bytes())
            .await;
        assert_eq!(ack, WebhookAck::Rejected);
    }
}
