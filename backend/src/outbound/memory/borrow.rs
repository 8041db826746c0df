//! In-memory `BorrowRequestRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{BorrowRequestRepository, BorrowRequestRepositoryError};
use crate::domain::{BorrowDecision, BorrowRequest, BorrowStatus, OPEN_STATUSES, ResponseToken};

use super::MemoryStore;

#[async_trait]
impl BorrowRequestRepository for MemoryStore {
    async fn insert_pending(
        &self,
        request: &BorrowRequest,
    ) -> Result<(), BorrowRequestRepositoryError> {
        let mut tables = self.lock();
        let item_busy = tables
            .borrow_requests
            .values()
            .any(|r| r.item_id == request.item_id && OPEN_STATUSES.contains(&r.status));
        if item_busy {
            return Err(BorrowRequestRepositoryError::item_unavailable(request.item_id));
        }
        tables.borrow_requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn has_open_request(&self, item_id: &Uuid) -> Result<bool, BorrowRequestRepositoryError> {
        Ok(self
            .lock()
            .borrow_requests
            .values()
            .any(|r| r.item_id == *item_id && OPEN_STATUSES.contains(&r.status)))
    }

    async fn find_by_id(
        &self,
        id: &Uuid,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        Ok(self.lock().borrow_requests.get(id).cloned())
    }

    async fn find_by_token(
        &self,
        token: &ResponseToken,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        Ok(self
            .lock()
            .borrow_requests
            .values()
            .find(|r| r.response_token == *token)
            .cloned())
    }

    async fn resolve_pending(
        &self,
        token: &ResponseToken,
        decision: BorrowDecision,
        at: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut tables = self.lock();
        let Some(request) = tables
            .borrow_requests
            .values_mut()
            .find(|r| r.response_token == *token && r.status == BorrowStatus::Pending)
        else {
            return Ok(None);
        };
        request.status = decision.target_status();
        let buffered = request.pending_video_url.take();
        if decision == BorrowDecision::Approve {
            request.approved_at = Some(at);
            request.video_url = buffered;
        }
        Ok(Some(request.clone()))
    }

    async fn transition(
        &self,
        id: &Uuid,
        from: &[BorrowStatus],
        to: BorrowStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut tables = self.lock();
        let Some(request) = tables
            .borrow_requests
            .get_mut(id)
            .filter(|r| from.contains(&r.status))
        else {
            return Ok(None);
        };
        request.status = to;
        match to {
            BorrowStatus::Active => request.activated_at = Some(at),
            BorrowStatus::Returned => request.returned_at = Some(at),
            BorrowStatus::Pending | BorrowStatus::Approved | BorrowStatus::Declined => {}
        }
        Ok(Some(request.clone()))
    }

    async fn attach_video(
        &self,
        id: &Uuid,
        video_url: &str,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut tables = self.lock();
        let Some(request) = tables.borrow_requests.get_mut(id).filter(|r| {
            r.status == BorrowStatus::Approved && r.video_url.as_deref() != Some(video_url)
        }) else {
            return Ok(None);
        };
        request.video_url = Some(video_url.to_owned());
        Ok(Some(request.clone()))
    }

    async fn buffer_video(
        &self,
        id: &Uuid,
        video_url: &str,
    ) -> Result<Option<BorrowRequest>, BorrowRequestRepositoryError> {
        let mut tables = self.lock();
        let Some(request) = tables.borrow_requests.get_mut(id).filter(|r| {
            r.status == BorrowStatus::Pending && r.pending_video_url.as_deref() != Some(video_url)
        }) else {
            return Ok(None);
        };
        request.pending_video_url = Some(video_url.to_owned());
        Ok(Some(request.clone()))
    }
}
