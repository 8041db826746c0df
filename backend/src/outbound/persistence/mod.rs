//! PostgreSQL persistence adapters using Diesel.
//!
//! Repositories translate between Diesel rows (`models.rs`, `schema.rs`) and
//! domain types; neither row structs nor constraint names leak out of this
//! module. Connections come from a `bb8` pool over `diesel-async`.

pub(crate) mod diesel_helpers;
mod diesel_borrow_request_repository;
mod diesel_directory;
mod diesel_feedback_vote_repository;
mod diesel_invitation_repository;
mod diesel_membership_repository;
mod models;
mod pool;
mod schema;

pub use diesel_borrow_request_repository::DieselBorrowRequestRepository;
pub use diesel_directory::DieselDirectory;
pub use diesel_feedback_vote_repository::DieselFeedbackVoteRepository;
pub use diesel_invitation_repository::DieselInvitationRepository;
pub use diesel_membership_repository::DieselMembershipRepository;
pub use pool::{DbPool, PoolConfig, PoolError, run_migrations};
