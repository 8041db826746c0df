//! PostgreSQL-backed `FeedbackVoteRepository`.
//!
//! The `(issue_number, user_id)` primary key makes the upsert idempotent:
//! `ON CONFLICT DO NOTHING` reports zero inserted rows for a repeat vote.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{FeedbackVoteRepository, FeedbackVoteRepositoryError};
use crate::domain::{FeedbackVote, IssueNumber};

use super::diesel_helpers::{DieselFailure, classify_diesel_error, count_to_u64};
use super::models::NewFeedbackVoteRow;
use super::pool::{DbPool, PoolError};
use super::schema::feedback_votes;

#[derive(Clone)]
pub struct DieselFeedbackVoteRepository {
    pool: DbPool,
}

impl DieselFeedbackVoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FeedbackVoteRepositoryError {
    FeedbackVoteRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> FeedbackVoteRepositoryError {
    match classify_diesel_error(error, "feedback_votes") {
        DieselFailure::Connection => {
            FeedbackVoteRepositoryError::connection("database connection error")
        }
        DieselFailure::UniqueViolation { .. } => FeedbackVoteRepositoryError::query("duplicate vote"),
        DieselFailure::Query(message) => FeedbackVoteRepositoryError::query(message),
    }
}

fn issue_column(issue: IssueNumber) -> Result<i32, FeedbackVoteRepositoryError> {
    i32::try_from(issue.get())
        .map_err(|_| FeedbackVoteRepositoryError::query("issue number out of range"))
}

#[async_trait]
impl FeedbackVoteRepository for DieselFeedbackVoteRepository {
    async fn upsert_vote(&self, vote: &FeedbackVote) -> Result<bool, FeedbackVoteRepositoryError> {
        let row = NewFeedbackVoteRow {
            issue_number: issue_column(vote.issue_number)?,
            user_id: *vote.user_id.as_uuid(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(feedback_votes::table)
            .values(&row)
            .on_conflict((feedback_votes::issue_number, feedback_votes::user_id))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted == 1)
    }

    async fn count_voters(&self, issue: IssueNumber) -> Result<u64, FeedbackVoteRepositoryError> {
        let issue_number = issue_column(issue)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let count: i64 = feedback_votes::table
            .filter(feedback_votes::issue_number.eq(issue_number))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(count_to_u64(count))
    }
}
