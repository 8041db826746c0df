//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and ports and remain testable without I/O.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;

use crate::domain::ports::{
    BorrowRequestRepository, EphemeralStore, FeedbackVoteRepository, InvitationRepository,
    ItemDirectory, LoginService, MembershipRepository, Notifier, UserDirectory,
};
use crate::domain::{
    BorrowService, BorrowServicePorts, CapabilityCodec, CollectionService, FeedbackService,
    GenerationResultBridge, InvitationService, InvitationServicePorts, PublicLinks,
    VideoWebhookService, WebhookVerifier,
};

use super::invite_cookies::InviteCookieSigner;

/// Parameter object bundling the use-cases reachable over HTTP.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub borrows: Arc<BorrowService>,
    pub invitations: Arc<InvitationService>,
    pub collections: Arc<CollectionService>,
    pub feedback: Arc<FeedbackService>,
    pub webhooks: Arc<VideoWebhookService>,
    pub results: Arc<GenerationResultBridge>,
}

/// Driven adapters the lending services are wired against.
#[derive(Clone)]
pub struct LendingAdapters {
    pub login: Arc<dyn LoginService>,
    pub borrow_requests: Arc<dyn BorrowRequestRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub feedback_votes: Arc<dyn FeedbackVoteRepository>,
    pub items: Arc<dyn ItemDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub results: Arc<dyn EphemeralStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Tunables and secrets shared by the lending services.
#[derive(Debug, Clone)]
pub struct LendingSettings {
    pub links: PublicLinks,
    pub capabilities: CapabilityCodec,
    pub webhook_verifier: WebhookVerifier,
    pub playback_base_url: String,
    pub invitation_ttl: chrono::Duration,
    pub result_ttl: Duration,
    pub cookie_secure: bool,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub borrows: Arc<BorrowService>,
    pub invitations: Arc<InvitationService>,
    pub collections: Arc<CollectionService>,
    pub feedback: Arc<FeedbackService>,
    pub webhooks: Arc<VideoWebhookService>,
    pub results: Arc<GenerationResultBridge>,
    pub invite_cookies: InviteCookieSigner,
}

impl HttpState {
    /// Construct state from the use-case bundle and the cookie signer.
    pub fn new(ports: HttpStatePorts, invite_cookies: InviteCookieSigner) -> Self {
        let HttpStatePorts {
            login,
            borrows,
            invitations,
            collections,
            feedback,
            webhooks,
            results,
        } = ports;
        Self {
            login,
            borrows,
            invitations,
            collections,
            feedback,
            webhooks,
            results,
            invite_cookies,
        }
    }

    /// Wire every lending service against `adapters`.
    pub fn from_adapters(adapters: LendingAdapters, settings: LendingSettings) -> Self {
        let LendingAdapters {
            login,
            borrow_requests,
            invitations,
            memberships,
            feedback_votes,
            items,
            users,
            results,
            notifier,
            clock,
        } = adapters;
        let LendingSettings {
            links,
            capabilities,
            webhook_verifier,
            playback_base_url,
            invitation_ttl,
            result_ttl,
            cookie_secure,
        } = settings;

        let borrows = Arc::new(BorrowService::new(
            BorrowServicePorts {
                requests: borrow_requests,
                items,
                users,
                notifier: notifier.clone(),
                clock: clock.clone(),
            },
            links.clone(),
        ));
        let invitation_service = Arc::new(InvitationService::new(
            InvitationServicePorts {
                invitations,
                memberships: memberships.clone(),
                notifier,
                clock: clock.clone(),
            },
            links,
            invitation_ttl,
        ));
        let webhooks = Arc::new(VideoWebhookService::new(
            webhook_verifier,
            borrows.clone(),
            clock,
            playback_base_url,
        ));

        Self::new(
            HttpStatePorts {
                login,
                borrows,
                invitations: invitation_service,
                collections: Arc::new(CollectionService::new(memberships)),
                feedback: Arc::new(FeedbackService::new(feedback_votes, capabilities.clone())),
                webhooks,
                results: Arc::new(GenerationResultBridge::new(results, result_ttl)),
            },
            InviteCookieSigner::new(capabilities, cookie_secure),
        )
    }
}
