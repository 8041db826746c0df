//! Driven and driving ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod borrow_request_repository;
mod directory;
mod ephemeral_store;
mod feedback_vote_repository;
mod invitation_repository;
mod login_service;
mod membership_repository;
mod notifier;

#[cfg(test)]
pub use borrow_request_repository::MockBorrowRequestRepository;
pub use borrow_request_repository::{BorrowRequestRepository, BorrowRequestRepositoryError};
#[cfg(test)]
pub use directory::{MockItemDirectory, MockUserDirectory};
pub use directory::{DirectoryError, ItemDirectory, ItemSummary, UserDirectory};
#[cfg(test)]
pub use ephemeral_store::MockEphemeralStore;
pub use ephemeral_store::{
    EphemeralKey, EphemeralKeyValidationError, EphemeralStore, EphemeralStoreError,
};
#[cfg(test)]
pub use feedback_vote_repository::MockFeedbackVoteRepository;
pub use feedback_vote_repository::{FeedbackVoteRepository, FeedbackVoteRepositoryError};
#[cfg(test)]
pub use invitation_repository::MockInvitationRepository;
pub use invitation_repository::{InvitationRepository, InvitationRepositoryError};
pub use login_service::{
    FIXTURE_BORROWER, FIXTURE_LENDER, FixtureAccount, FixtureLoginService, LoginService,
};
#[cfg(test)]
pub use membership_repository::MockMembershipRepository;
pub use membership_repository::{MembershipRepository, MembershipRepositoryError};
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{DeliveryError, Notifier};
