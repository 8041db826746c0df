//! Builders wiring driven adapters into the HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use neighbourly::domain::ports::{
    BorrowRequestRepository, EphemeralStore, FeedbackVoteRepository, FixtureLoginService,
    InvitationRepository, ItemDirectory, MembershipRepository, Notifier, UserDirectory,
};
use neighbourly::inbound::http::state::{HttpState, LendingAdapters};
use neighbourly::outbound::cache::MemoryEphemeralStore;
use neighbourly::outbound::memory::MemoryStore;
use neighbourly::outbound::notify::LoggingNotifier;
use neighbourly::outbound::persistence::{
    DbPool, DieselBorrowRequestRepository, DieselDirectory, DieselFeedbackVoteRepository,
    DieselInvitationRepository, DieselMembershipRepository,
};

use super::ServerConfig;

/// Repositories and directories behind the lending services.
struct StoreAdapters {
    borrow_requests: Arc<dyn BorrowRequestRepository>,
    invitations: Arc<dyn InvitationRepository>,
    memberships: Arc<dyn MembershipRepository>,
    feedback_votes: Arc<dyn FeedbackVoteRepository>,
    items: Arc<dyn ItemDirectory>,
    users: Arc<dyn UserDirectory>,
}

fn diesel_adapters(pool: &DbPool) -> StoreAdapters {
    let directory = Arc::new(DieselDirectory::new(pool.clone()));
    StoreAdapters {
        borrow_requests: Arc::new(DieselBorrowRequestRepository::new(pool.clone())),
        invitations: Arc::new(DieselInvitationRepository::new(pool.clone())),
        memberships: Arc::new(DieselMembershipRepository::new(pool.clone())),
        feedback_votes: Arc::new(DieselFeedbackVoteRepository::new(pool.clone())),
        items: directory.clone(),
        users: directory,
    }
}

fn memory_adapters() -> StoreAdapters {
    let store = Arc::new(MemoryStore::seeded());
    StoreAdapters {
        borrow_requests: store.clone(),
        invitations: store.clone(),
        memberships: store.clone(),
        feedback_votes: store.clone(),
        items: store.clone(),
        users: store,
    }
}

/// Build the shared HTTP state, falling back to in-process adapters for
/// anything the configuration does not provide.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let StoreAdapters {
        borrow_requests,
        invitations,
        memberships,
        feedback_votes,
        items,
        users,
    } = match &config.db_pool {
        Some(pool) => diesel_adapters(pool),
        None => memory_adapters(),
    };
    let results: Arc<dyn EphemeralStore> = match &config.result_store {
        Some(store) => store.clone(),
        None => Arc::new(MemoryEphemeralStore::new(clock.clone())),
    };
    let notifier: Arc<dyn Notifier> = match &config.notifier {
        Some(notifier) => notifier.clone(),
        None => Arc::new(LoggingNotifier),
    };

    web::Data::new(HttpState::from_adapters(
        LendingAdapters {
            login: Arc::new(FixtureLoginService),
            borrow_requests,
            invitations,
            memberships,
            feedback_votes,
            items,
            users,
            results,
            notifier,
            clock,
        },
        config.lending.clone(),
    ))
}
