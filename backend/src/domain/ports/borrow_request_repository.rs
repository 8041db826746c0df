//! Persistence port for borrow requests.
//!
//! Every state change is a conditional write: adapters apply it only when the
//! stored row still matches the expected source state and report whether the
//! write happened. Read-then-write sequences are never used for transitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{BorrowDecision, BorrowRequest, BorrowStatus, ResponseToken};

use super::define_port_error;

define_port_error! {
    /// Errors raised by borrow request storage.
    pub enum BorrowRequestRepositoryError {
        /// Storage could not be reached.
        Connection { message: String } => "borrow request storage unavailable: {message}",
        /// A query failed.
        Query { message: String } => "borrow request query failed: {message}",
        /// Another open request already references the item.
        ItemUnavailable { item_id: Uuid } => "item {item_id} already has an open borrow request",
    }
}

/// Port for borrow request storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowRequestRepository: Send + Sync {
    /// Insert a new pending request.
    ///
    /// Fails with `ItemUnavailable` when another open request exists for the
    /// same item, including one inserted concurrently.
    async fn insert_pending(&self, request: &BorrowRequest)
    -> Result<(), BorrowRequestRepositoryError>;

    /// Whether the item has a pending, approved, or active request.
    async fn has_open_request(&self, item_id: &Uuid) -> Result<bool, BorrowRequestRepositoryError>;

    /// Look up by id.
    async fn find_by_id(&self, id: &Uuid)
    -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError>;

    /// Look up by response token.
    async fn find_by_token(
        &self,
        token: &ResponseToken,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError>;

    /// Apply `decision` if and only if the request is still pending.
    ///
    /// Approval stamps `approved_at` and promotes any buffered video. Returns
    /// the updated request when this call performed the transition.
    async fn resolve_pending(
        &self,
        token: &ResponseToken,
        decision: BorrowDecision,
        at: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError>;

    /// Move to `to` if the current status is one of `from`.
    ///
    /// Stamps `activated_at` or `returned_at` as appropriate. Returns the
    /// updated request when this call performed the transition.
    async fn transition(
        &self,
        id: &Uuid,
        from: &[BorrowStatus],
        to: BorrowStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError>;

    /// Set the video URL if the request is approved and the value differs.
    ///
    /// Returns the updated request when the stored value changed.
    async fn attach_video(
        &self,
        id: &Uuid,
        video_url: &str,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError>;

    /// Buffer a video URL while the request is still pending.
    ///
    /// Returns the updated request when the buffered value changed.
    async fn buffer_video(
        &self,
        id: &Uuid,
        video_url: &str,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError>;
}
