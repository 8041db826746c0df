//! Test doubles shared by unit and integration tests.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use actix_web::cookie::Key;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::notification::{
    DeliveryReceipt, NotificationChannel, NotificationParams, NotificationTemplate,
};
use crate::domain::ports::{DeliveryError, FixtureLoginService, Notifier};
use crate::domain::result_bridge::DEFAULT_RESULT_TTL_SECS;
use crate::domain::video_webhook_service::DEFAULT_PLAYBACK_BASE_URL;
use crate::domain::{
    CapabilityCodec, CapabilitySecret, DEFAULT_INVITATION_TTL_DAYS, PublicLinks, WebhookVerifier,
};
use crate::inbound::http::state::{HttpState, LendingAdapters, LendingSettings};
use crate::outbound::cache::MemoryEphemeralStore;
use crate::outbound::memory::MemoryStore;

/// Clock whose time only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move time forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => panic!("duration out of range: {error}; delta={delta:?}"),
        };
        *self.lock() += delta;
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.lock() = instant;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

/// One captured notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub template: NotificationTemplate,
    pub params: NotificationParams,
}

/// Notifier that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail with a transport error.
    pub fn fail_deliveries(&self, failing: bool) {
        *self
            .failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = failing;
    }

    /// Every successful delivery so far.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Deliveries matching `template` and `channel`.
    pub fn count(&self, template: NotificationTemplate, channel: NotificationChannel) -> usize {
        self.sent()
            .iter()
            .filter(|sent| sent.template == template && sent.channel == channel)
            .count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        template: NotificationTemplate,
        params: &NotificationParams,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let failing = *self
            .failing
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if failing {
            return Err(DeliveryError::transport("recording notifier set to fail"));
        }
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(SentNotification {
                channel,
                recipient: recipient.to_owned(),
                template,
                params: params.clone(),
            });
        Ok(DeliveryReceipt::default())
    }
}

/// Webhook signing secret used by [`LendingHarness`].
pub const HARNESS_WEBHOOK_SECRET: &[u8] = b"whsec-harness-secret";

/// Public base URL used by [`LendingHarness`].
pub const HARNESS_BASE_URL: &str = "https://lend.example.org";

/// Every lending service wired against in-memory adapters.
///
/// Starts on 2026-05-01 09:00 UTC with the development data set loaded.
pub struct LendingHarness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<MutableClock>,
    pub state: HttpState,
    verifier: WebhookVerifier,
    session_key: Key,
}

impl LendingHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::seeded());
        let notifier = Arc::new(RecordingNotifier::new());
        let start = match Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).single() {
            Some(instant) => instant,
            None => panic!("harness start instant is ambiguous"),
        };
        let clock = Arc::new(MutableClock::new(start));
        let verifier = WebhookVerifier::new(
            HARNESS_WEBHOOK_SECRET.to_vec(),
            chrono::Duration::seconds(300),
        );
        let codec = match CapabilityCodec::new("NBLY", CapabilitySecret::development()) {
            Ok(codec) => codec,
            Err(error) => panic!("harness codec: {error}"),
        };
        let links = match PublicLinks::new(HARNESS_BASE_URL) {
            Ok(links) => links,
            Err(error) => panic!("harness links: {error}"),
        };

        let state = HttpState::from_adapters(
            LendingAdapters {
                login: Arc::new(FixtureLoginService),
                borrow_requests: store.clone(),
                invitations: store.clone(),
                memberships: store.clone(),
                feedback_votes: store.clone(),
                items: store.clone(),
                users: store.clone(),
                results: Arc::new(MemoryEphemeralStore::new(clock.clone())),
                notifier: notifier.clone(),
                clock: clock.clone(),
            },
            LendingSettings {
                links,
                capabilities: codec,
                webhook_verifier: verifier.clone(),
                playback_base_url: DEFAULT_PLAYBACK_BASE_URL.to_owned(),
                invitation_ttl: chrono::Duration::days(i64::from(DEFAULT_INVITATION_TTL_DAYS)),
                result_ttl: Duration::from_secs(DEFAULT_RESULT_TTL_SECS),
                cookie_secure: false,
            },
        );

        Self {
            store,
            notifier,
            clock,
            state,
            verifier,
            session_key: Key::generate(),
        }
    }

    /// Signature header value for `body` at the harness clock's time.
    pub fn sign_webhook(&self, body: &[u8]) -> String {
        self.verifier.sign(self.clock.utc().timestamp(), body)
    }

    /// Application exposing every lending route.
    ///
    /// Apps built from the same harness share a session key.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        crate::inbound::http::test_app(
            web::Data::new(self.state.clone()),
            self.session_key.clone(),
        )
    }
}

impl Default for LendingHarness {
    fn default() -> Self {
        Self::new()
    }
}
