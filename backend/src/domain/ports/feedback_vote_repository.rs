//! Persistence port for feedback votes.

use async_trait::async_trait;

use crate::domain::{FeedbackVote, IssueNumber};

use super::define_port_error;

define_port_error! {
    /// Errors raised by vote storage.
    pub enum FeedbackVoteRepositoryError {
        /// Storage could not be reached.
        Connection { message: String } => "feedback storage unavailable: {message}",
        /// A query failed.
        Query { message: String } => "feedback query failed: {message}",
    }
}

/// Port for vote storage, unique on `(issue_number, user_id)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackVoteRepository: Send + Sync {
    /// Insert the vote unless it exists. Returns whether a row was inserted.
    async fn upsert_vote(&self, vote: &FeedbackVote) -> Result<bool, FeedbackVoteRepositoryError>;

    /// Distinct voters on an issue.
    async fn count_voters(&self, issue: IssueNumber) -> Result<u64, FeedbackVoteRepositoryError>;
}
