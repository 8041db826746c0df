//! PostgreSQL-backed `BorrowRequestRepository`.
//!
//! Transitions are single `UPDATE ... WHERE status IN (...) RETURNING *`
//! statements, so two racing writers can never both observe success. The
//! `borrow_requests_one_open_per_item` partial unique index backs the
//! one-open-request-per-item rule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{BorrowRequestRepository, BorrowRequestRepositoryError};
use crate::domain::{
    BorrowDecision, BorrowRequest, BorrowStatus, OPEN_STATUSES, ResponseToken, UserId,
};

use super::diesel_helpers::{DieselFailure, classify_diesel_error};
use super::models::{BorrowRequestRow, NewBorrowRequestRow};
use super::pool::{DbPool, PoolError};
use super::schema::borrow_requests;

const ONE_OPEN_PER_ITEM: &str = "borrow_requests_one_open_per_item";

/// Diesel implementation of the borrow request port.
#[derive(Clone)]
pub struct DieselBorrowRequestRepository {
    pool: DbPool,
}

impl DieselBorrowRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> BorrowRequestRepositoryError {
    BorrowRequestRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error, item_id: Option<Uuid>) -> BorrowRequestRepositoryError {
    match classify_diesel_error(error, "borrow_requests") {
        DieselFailure::Connection => {
            BorrowRequestRepositoryError::connection("database connection error")
        }
        DieselFailure::UniqueViolation { constraint }
            if constraint.as_deref() == Some(ONE_OPEN_PER_ITEM) =>
        {
            match item_id {
                Some(item_id) => BorrowRequestRepositoryError::item_unavailable(item_id),
                None => BorrowRequestRepositoryError::query("duplicate open request"),
            }
        }
        DieselFailure::UniqueViolation { .. } => {
            BorrowRequestRepositoryError::query("unique constraint violated")
        }
        DieselFailure::Query(message) => BorrowRequestRepositoryError::query(message),
    }
}

fn query_error(error: diesel::result::Error) -> BorrowRequestRepositoryError {
    map_diesel_error(error, None)
}

fn row_to_request(row: BorrowRequestRow) -> Result<BorrowRequest, BorrowRequestRepositoryError> {
    let status = row
        .status
        .parse::<BorrowStatus>()
        .map_err(|err| BorrowRequestRepositoryError::query(format!("corrupted row: {err}")))?;
    let response_token = ResponseToken::parse(&row.response_token)
        .map_err(|_| BorrowRequestRepositoryError::query("corrupted row: response token"))?;
    Ok(BorrowRequest {
        id: row.id,
        item_id: row.item_id,
        borrower_id: UserId::from_uuid(row.borrower_id),
        lender_id: UserId::from_uuid(row.lender_id),
        status,
        request_message: row.request_message,
        requested_return_date: row.requested_return_date,
        response_token,
        video_url: row.video_url,
        pending_video_url: row.pending_video_url,
        approved_at: row.approved_at,
        activated_at: row.activated_at,
        returned_at: row.returned_at,
        created_at: row.created_at,
    })
}

fn status_names(statuses: &[BorrowStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl BorrowRequestRepository for DieselBorrowRequestRepository {
    async fn insert_pending(
        &self,
        request: &BorrowRequest,
    ) -> Result<(), BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewBorrowRequestRow {
            id: request.id,
            item_id: request.item_id,
            borrower_id: *request.borrower_id.as_uuid(),
            lender_id: *request.lender_id.as_uuid(),
            status: BorrowStatus::Pending.as_str(),
            request_message: &request.request_message,
            requested_return_date: request.requested_return_date,
            response_token: request.response_token.as_str(),
            video_url: None,
            pending_video_url: None,
            approved_at: None,
            activated_at: None,
            returned_at: None,
            created_at: request.created_at,
        };
        diesel::insert_into(borrow_requests::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, Some(request.item_id)))
    }

    async fn has_open_request(&self, item_id: &Uuid) -> Result<bool, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(diesel::dsl::exists(
            borrow_requests::table
                .filter(borrow_requests::item_id.eq(item_id))
                .filter(borrow_requests::status.eq_any(status_names(&OPEN_STATUSES))),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(query_error)
    }

    async fn find_by_id(
        &self,
        id: &Uuid,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        borrow_requests::table
            .find(id)
            .select(BorrowRequestRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error)?
            .map(row_to_request)
            .transpose()
    }

    async fn find_by_token(
        &self,
        token: &ResponseToken,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        borrow_requests::table
            .filter(borrow_requests::response_token.eq(token.as_str()))
            .select(BorrowRequestRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error)?
            .map(row_to_request)
            .transpose()
    }

    async fn resolve_pending(
        &self,
        token: &ResponseToken,
        decision: BorrowDecision,
        at: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let pending = borrow_requests::table
            .filter(borrow_requests::response_token.eq(token.as_str()))
            .filter(borrow_requests::status.eq(BorrowStatus::Pending.as_str()));
        let updated = match decision {
            BorrowDecision::Approve => diesel::update(pending)
                .set((
                    borrow_requests::status.eq(BorrowStatus::Approved.as_str()),
                    borrow_requests::approved_at.eq(Some(at)),
                    borrow_requests::video_url.eq(borrow_requests::pending_video_url),
                    borrow_requests::pending_video_url.eq(None::<String>),
                ))
                .returning(BorrowRequestRow::as_returning())
                .get_result(&mut conn)
                .await,
            BorrowDecision::Decline => diesel::update(pending)
                .set((
                    borrow_requests::status.eq(BorrowStatus::Declined.as_str()),
                    borrow_requests::pending_video_url.eq(None::<String>),
                ))
                .returning(BorrowRequestRow::as_returning())
                .get_result(&mut conn)
                .await,
        };
        updated
            .optional()
            .map_err(query_error)?
            .map(row_to_request)
            .transpose()
    }

    async fn transition(
        &self,
        id: &Uuid,
        from: &[BorrowStatus],
        to: BorrowStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let current = borrow_requests::table
            .filter(borrow_requests::id.eq(id))
            .filter(borrow_requests::status.eq_any(status_names(from)));
        let updated = match to {
            BorrowStatus::Active => diesel::update(current)
                .set((
                    borrow_requests::status.eq(to.as_str()),
                    borrow_requests::activated_at.eq(Some(at)),
                ))
                .returning(BorrowRequestRow::as_returning())
                .get_result(&mut conn)
                .await,
            BorrowStatus::Returned => diesel::update(current)
                .set((
                    borrow_requests::status.eq(to.as_str()),
                    borrow_requests::returned_at.eq(Some(at)),
                ))
                .returning(BorrowRequestRow::as_returning())
                .get_result(&mut conn)
                .await,
            BorrowStatus::Pending | BorrowStatus::Approved | BorrowStatus::Declined => {
                diesel::update(current)
                    .set(borrow_requests::status.eq(to.as_str()))
                    .returning(BorrowRequestRow::as_returning())
                    .get_result(&mut conn)
                    .await
            }
        };
        updated
            .optional()
            .map_err(query_error)?
            .map(row_to_request)
            .transpose()
    }

    async fn attach_video(
        &self,
        id: &Uuid,
        video_url: &str,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(
            borrow_requests::table
                .filter(borrow_requests::id.eq(id))
                .filter(borrow_requests::status.eq(BorrowStatus::Approved.as_str()))
                .filter(
                    borrow_requests::video_url
                        .is_null()
                        .or(borrow_requests::video_url.ne(video_url)),
                ),
        )
        .set(borrow_requests::video_url.eq(Some(video_url)))
        .returning(BorrowRequestRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(query_error)?
        .map(row_to_request)
        .transpose()
    }

    async fn buffer_video(
        &self,
        id: &Uuid,
        video_url: &str,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(
            borrow_requests::table
                .filter(borrow_requests::id.eq(id))
                .filter(borrow_requests::status.eq(BorrowStatus::Pending.as_str()))
                .filter(
                    borrow_requests::pending_video_url
                        .is_null()
                        .or(borrow_requests::pending_video_url.ne(video_url)),
                ),
        )
        .set(borrow_requests::pending_video_url.eq(Some(video_url)))
        .returning(BorrowRequestRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(query_error)?
        .map(row_to_request)
        .transpose()
    }
}
