//! Feedback votes and attribution slugs.
//!
//! A vote is unique on `(issue_number, user_id)`: voting twice changes
//! nothing and the tally counts distinct voters only.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::ports::{FeedbackVoteRepository, FeedbackVoteRepositoryError};
use super::{CapabilityCodec, Error, UserId};

/// Purpose bound into attribution slugs.
pub const ATTRIBUTION_PURPOSE: &str = "feedback";

/// Positive issue number in the feedback tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IssueNumber(u32);

impl IssueNumber {
    /// Validate a raw issue number.
    pub fn new(raw: u32) -> Result<Self, Error> {
        if raw == 0 {
            return Err(Error::invalid_request("issue number must be positive"));
        }
        Ok(Self(raw))
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's vote on one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackVote {
    pub issue_number: IssueNumber,
    pub user_id: UserId,
}

/// Tally returned after voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub issue_number: IssueNumber,
    pub voters: u64,
    /// Whether this call recorded a new vote.
    pub newly_recorded: bool,
}

fn map_vote_error(error: FeedbackVoteRepositoryError) -> Error {
    match error {
        FeedbackVoteRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("feedback storage unavailable: {message}"))
        }
        FeedbackVoteRepositoryError::Query { message } => {
            Error::internal(format!("feedback storage error: {message}"))
        }
    }
}

/// Feedback use-cases.
#[derive(Clone)]
pub struct FeedbackService {
    votes: Arc<dyn FeedbackVoteRepository>,
    codec: CapabilityCodec,
}

impl FeedbackService {
    pub fn new(votes: Arc<dyn FeedbackVoteRepository>, codec: CapabilityCodec) -> Self {
        Self { votes, codec }
    }

    /// Record `user_id`'s upvote and report the de-duplicated voter count.
    pub async fn upvote(&self, issue_number: IssueNumber, user_id: UserId) -> Result<VoteTally, Error> {
        let vote = FeedbackVote {
            issue_number,
            user_id,
        };
        let newly_recorded = self.votes.upsert_vote(&vote).await.map_err(map_vote_error)?;
        let voters = self
            .votes
            .count_voters(issue_number)
            .await
            .map_err(map_vote_error)?;
        if newly_recorded {
            info!(issue = %issue_number, voters, "feedback vote recorded");
        } else {
            debug!(issue = %issue_number, "duplicate feedback vote ignored");
        }
        Ok(VoteTally {
            issue_number,
            voters,
            newly_recorded,
        })
    }

    /// Slug that attributes feedback to `user_id` without exposing a session.
    pub fn attribution_slug(&self, user_id: &UserId) -> Result<String, Error> {
        self.codec
            .issue(&user_id.to_string(), ATTRIBUTION_PURPOSE)
            .map_err(|err| Error::internal(err.to_string()))
    }

    /// Resolve an attribution slug back to its user.
    pub fn resolve_attribution(&self, slug: &str) -> Result<UserId, Error> {
        let subject = self
            .codec
            .verify(slug, ATTRIBUTION_PURPOSE)
            .map_err(|_| Error::invalid_token("attribution slug is not valid"))?;
        UserId::new(&subject).map_err(|_| Error::invalid_token("attribution slug is not valid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CapabilitySecret;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockFeedbackVoteRepository;
    use rstest::rstest;

    fn codec() -> CapabilityCodec {
        CapabilityCodec::new("SLFB", CapabilitySecret::development()).expect("codec")
    }

    #[rstest]
    #[case(true, 3)]
    #[case(false, 3)]
    #[tokio::test]
    async fn upvote_reports_distinct_voters(#[case] inserted: bool, #[case] voters: u64) {
        let mut repo = MockFeedbackVoteRepository::new();
        repo.expect_upsert_vote().times(1).return_once(move |_| Ok(inserted));
        repo.expect_count_voters().times(1).return_once(move |_| Ok(voters));

        let issue = IssueNumber::new(42).expect("issue");
        let tally = FeedbackService::new(Arc::new(repo), codec())
            .upvote(issue, UserId::random())
            .await
            .expect("tally");

        assert_eq!(tally.voters, voters);
        assert_eq!(tally.newly_recorded, inserted);
    }

    #[tokio::test]
    async fn storage_outage_is_unavailable() {
        let mut repo = MockFeedbackVoteRepository::new();
        repo.expect_upsert_vote()
            .return_once(|_| Err(FeedbackVoteRepositoryError::connection("refused")));
        repo.expect_count_voters().never();

        let err = FeedbackService::new(Arc::new(repo), codec())
            .upvote(IssueNumber::new(1).expect("issue"), UserId::random())
            .await
            .expect_err("outage");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn zero_is_not_an_issue_number() {
        assert!(IssueNumber::new(0).is_err());
    }

    #[test]
    fn attribution_slug_resolves_to_its_user() {
        let service = FeedbackService::new(Arc::new(MockFeedbackVoteRepository::new()), codec());
        let user = UserId::random();
        let slug = service.attribution_slug(&user).expect("slug");
        assert!(slug.starts_with("SLFB:v1:"));
        assert_eq!(service.resolve_attribution(&slug).expect("user"), user);
    }

    #[rstest]
    #[case("SLFB:v1:not-a-uuid:00000000")]
    #[case("garbage")]
    fn bad_slugs_are_invalid_tokens(#[case] slug: &str) {
        let service = FeedbackService::new(Arc::new(MockFeedbackVoteRepository::new()), codec());
        let err = service.resolve_attribution(slug).expect_err("invalid");
        assert_eq!(err.code(), ErrorCode::InvalidToken);
    }
}
