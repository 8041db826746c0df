//! In-memory `FeedbackVoteRepository`.

use async_trait::async_trait;

use crate::domain::ports::{FeedbackVoteRepository, FeedbackVoteRepositoryError};
use crate::domain::{FeedbackVote, IssueNumber};

use super::MemoryStore;

#[async_trait]
impl FeedbackVoteRepository for MemoryStore {
    async fn upsert_vote(&self, vote: &FeedbackVote) -> Result<bool, FeedbackVoteRepositoryError> {
        Ok(self.lock().votes.insert((vote.issue_number, vote.user_id)))
    }

    async fn count_voters(&self, issue: IssueNumber) -> Result<u64, FeedbackVoteRepositoryError> {
        let voters = self
            .lock()
            .votes
            .iter()
            .filter(|(number, _)| *number == issue)
            .count();
        u64::try_from(voters).map_err(|_| FeedbackVoteRepositoryError::query("vote count overflow"))
    }
}
