//! Borrow request use-cases.
//!
//! Preconditions are checked before the first write; every transition is a
//! conditional update in the repository. Notifications run after the write
//! commits and only ever contribute warnings to the outcome.

use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::notification::{
    Notification, NotificationChannel, NotificationTemplate, NotificationWarning,
    dispatch_best_effort, unreachable_recipient,
};
use crate::domain::ports::{
    BorrowRequestRepository, BorrowRequestRepositoryError, DirectoryError, ItemDirectory,
    ItemSummary, Notifier, UserDirectory,
};
use crate::domain::{
    BorrowDecision, BorrowRequest, BorrowRequestDraft, BorrowRequestValidationError, BorrowStatus,
    Error, PublicLinks, ResponseToken, UserId,
};

/// Attempts made when a conditional write loses a race and state is re-read.
const CONDITIONAL_WRITE_ATTEMPTS: usize = 3;

/// Result of a state change plus any notification warnings.
#[derive(Debug, Clone)]
pub struct BorrowOutcome {
    pub request: BorrowRequest,
    pub warnings: Vec<NotificationWarning>,
}

/// Result of recording a handoff video.
#[derive(Debug, Clone)]
pub enum VideoAttachment {
    /// First attachment while approved; the lender was notified.
    Attached(BorrowOutcome),
    /// The request is still pending; the video is held until approval.
    Buffered(BorrowRequest),
    /// A different URL replaced an earlier one; no new notification.
    Replaced(BorrowRequest),
    /// The same URL was already recorded.
    Unchanged(BorrowRequest),
}

/// Public view rendered behind `/borrow-approval/{token}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowApprovalView {
    pub request_id: Uuid,
    pub item_title: String,
    pub borrower_name: String,
    pub status: BorrowStatus,
    pub request_message: String,
    pub requested_return_date: NaiveDate,
    pub video_url: Option<String>,
}

/// Collaborators for [`BorrowService`].
#[derive(Clone)]
pub struct BorrowServicePorts {
    pub requests: Arc<dyn BorrowRequestRepository>,
    pub items: Arc<dyn ItemDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Borrow request lifecycle service.
#[derive(Clone)]
pub struct BorrowService {
    requests: Arc<dyn BorrowRequestRepository>,
    items: Arc<dyn ItemDirectory>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    links: PublicLinks,
}

pub(crate) fn map_repository_error(error: BorrowRequestRepositoryError) -> Error {
    match error {
        BorrowRequestRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("borrow request storage unavailable: {message}"))
        }
        BorrowRequestRepositoryError::Query { message } => {
            Error::internal(format!("borrow request storage error: {message}"))
        }
        BorrowRequestRepositoryError::ItemUnavailable { item_id } => item_unavailable(item_id),
    }
}

pub(crate) fn map_directory_error(error: DirectoryError) -> Error {
    match error {
        DirectoryError::Connection { message } => {
            Error::service_unavailable(format!("directory unavailable: {message}"))
        }
        DirectoryError::Query { message } => Error::internal(format!("directory error: {message}")),
    }
}

fn item_unavailable(item_id: Uuid) -> Error {
    Error::conflict("item already has an open borrow request")
        .with_details(json!({ "code": "item_unavailable", "itemId": item_id }))
}

fn map_validation_error(error: &BorrowRequestValidationError) -> Error {
    let field = match error {
        BorrowRequestValidationError::MessageTooLong => "message",
        BorrowRequestValidationError::ReturnDateInPast => "returnBy",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "field": field }))
}

fn closed_request(request: &BorrowRequest) -> Error {
    Error::already_resolved("borrow request is closed")
        .with_details(json!({ "status": request.status.as_str() }))
}

fn not_yet_approved(request: &BorrowRequest) -> Error {
    Error::conflict("borrow request has not been approved")
        .with_details(json!({ "status": request.status.as_str() }))
}

fn concurrent_change(request_id: &Uuid) -> Error {
    Error::conflict("borrow request changed concurrently; retry")
        .with_details(json!({ "requestId": request_id }))
}

fn parse_response_token(raw: &str) -> Result<ResponseToken, Error> {
    ResponseToken::parse(raw).map_err(|_| Error::invalid_token("approval link is malformed"))
}

fn validate_video_url(raw: &str) -> Result<(), Error> {
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "https" || url.scheme() == "http" => Ok(()),
        _ => Err(Error::invalid_request("video url must be an absolute http(s) URL")),
    }
}

/// Pick a delivery route, falling back to the other channel.
fn route_for(
    contact: &crate::domain::UserContact,
    preferred: NotificationChannel,
) -> Option<(NotificationChannel, String)> {
    let sms = contact
        .phone
        .as_ref()
        .map(|phone| (NotificationChannel::Sms, phone.clone()));
    let email = contact
        .email
        .as_ref()
        .map(|email| (NotificationChannel::Email, email.to_string()));
    match preferred {
        NotificationChannel::Sms => sms.or(email),
        NotificationChannel::Email => email.or(sms),
    }
}

impl BorrowService {
    /// Wire the service.
    pub fn new(ports: BorrowServicePorts, links: PublicLinks) -> Self {
        let BorrowServicePorts {
            requests,
            items,
            users,
            notifier,
            clock,
        } = ports;
        Self {
            requests,
            items,
            users,
            notifier,
            clock,
            links,
        }
    }

    /// Open a borrow request for `item_id`.
    ///
    /// The lender is the item's owner. Fails with `conflict` and detail code
    /// `self_borrow` when the borrower owns the item, or `item_unavailable`
    /// when another request is open.
    pub async fn create(
        &self,
        borrower_id: UserId,
        item_id: Uuid,
        message: &str,
        return_by: NaiveDate,
    ) -> Result<BorrowOutcome, Error> {
        let now = self.clock.utc();
        let draft = BorrowRequestDraft::new(item_id, borrower_id, message, return_by, now.date_naive())
            .map_err(|err| map_validation_error(&err))?;
        let item = self.require_item(&item_id).await?;
        if item.owner_id == borrower_id {
            return Err(Error::conflict("you cannot borrow your own item")
                .with_details(json!({ "code": "self_borrow", "itemId": item_id })));
        }
        if self
            .requests
            .has_open_request(&item_id)
            .await
            .map_err(map_repository_error)?
        {
            return Err(item_unavailable(item_id));
        }

        let request = BorrowRequest::open(draft, item.owner_id, now);
        self.requests
            .insert_pending(&request)
            .await
            .map_err(map_repository_error)?;
        info!(request_id = %request.id, %item_id, "borrow request opened");

        let notification_params = [
            ("approval_url", self.links.borrow_approval(&request.response_token)),
            ("item_title", item.title.clone()),
            ("return_by", request.requested_return_date.to_string()),
        ];
        let warnings = self
            .notify_user(
                &request.lender_id,
                NotificationChannel::Sms,
                NotificationTemplate::BorrowRequested,
                &notification_params,
            )
            .await;
        Ok(BorrowOutcome { request, warnings })
    }

    /// Public approval view for a response token.
    pub async fn view_by_token(&self, raw_token: &str) -> Result<BorrowApprovalView, Error> {
        let token = parse_response_token(raw_token)?;
        let request = self
            .requests
            .find_by_token(&token)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("borrow request not found"))?;
        let item_title = match self.items.find_item(&request.item_id).await {
            Ok(Some(item)) => item.title,
            Ok(None) => "Unlisted item".to_owned(),
            Err(error) => {
                warn!(%error, "item lookup failed while rendering approval view");
                "Unlisted item".to_owned()
            }
        };
        let borrower_name = self
            .contact_for(&request.borrower_id)
            .await
            .map_or_else(|| "A neighbour".to_owned(), |contact| contact.display_name);
        Ok(BorrowApprovalView {
            request_id: request.id,
            item_title,
            borrower_name,
            status: request.status,
            request_message: request.request_message,
            requested_return_date: request.requested_return_date,
            video_url: request.video_url,
        })
    }

    /// Answer a pending request; possession of the token is the authority.
    ///
    /// Exactly one caller wins the `pending` exit. Later calls with the same
    /// token fail with `already_resolved`.
    pub async fn respond(
        &self,
        raw_token: &str,
        decision: BorrowDecision,
    ) -> Result<BorrowOutcome, Error> {
        let token = parse_response_token(raw_token)?;
        let now = self.clock.utc();
        let resolved = self
            .requests
            .resolve_pending(&token, decision, now)
            .await
            .map_err(map_repository_error)?;
        let Some(request) = resolved else {
            return Err(self.unresolved_reason(&token).await);
        };
        info!(request_id = %request.id, status = %request.status, "borrow request answered");

        let template = match decision {
            BorrowDecision::Approve => NotificationTemplate::BorrowApproved,
            BorrowDecision::Decline => NotificationTemplate::BorrowDeclined,
        };
        let mut warnings = self
            .notify_user(
                &request.borrower_id,
                NotificationChannel::Email,
                template,
                &[("return_by", request.requested_return_date.to_string())],
            )
            .await;
        if decision == BorrowDecision::Approve && request.video_url.is_some() {
            debug!(request_id = %request.id, "promoting buffered handoff video");
            warnings.extend(self.notify_video_ready(&request).await);
        }
        Ok(BorrowOutcome { request, warnings })
    }

    /// Record the handoff video for a request.
    ///
    /// While approved the first distinct URL is stored and the lender is
    /// notified once; repeating the same URL is a no-op. A video arriving
    /// before approval is buffered and promoted by [`Self::respond`].
    pub async fn attach_video(
        &self,
        request_id: &Uuid,
        video_url: &str,
    ) -> Result<VideoAttachment, Error> {
        validate_video_url(video_url)?;
        for _ in 0..CONDITIONAL_WRITE_ATTEMPTS {
            let current = self.require_request(request_id).await?;
            match current.status {
                BorrowStatus::Pending => {
                    if current.pending_video_url.as_deref() == Some(video_url) {
                        return Ok(VideoAttachment::Unchanged(current));
                    }
                    if let Some(updated) = self
                        .requests
                        .buffer_video(request_id, video_url)
                        .await
                        .map_err(map_repository_error)?
                    {
                        info!(%request_id, "handoff video buffered until approval");
                        return Ok(VideoAttachment::Buffered(updated));
                    }
                }
                BorrowStatus::Approved => {
                    if current.video_url.as_deref() == Some(video_url) {
                        return Ok(VideoAttachment::Unchanged(current));
                    }
                    if let Some(updated) = self
                        .requests
                        .attach_video(request_id, video_url)
                        .await
                        .map_err(map_repository_error)?
                    {
                        if current.video_url.is_some() {
                            info!(%request_id, "handoff video replaced");
                            return Ok(VideoAttachment::Replaced(updated));
                        }
                        info!(%request_id, "handoff video attached");
                        let warnings = self.notify_video_ready(&updated).await;
                        return Ok(VideoAttachment::Attached(BorrowOutcome {
                            request: updated,
                            warnings,
                        }));
                    }
                }
                BorrowStatus::Active => {
                    return Err(Error::conflict(
                        "video can only be attached while the request is approved",
                    )
                    .with_details(json!({ "status": current.status.as_str() })));
                }
                BorrowStatus::Declined | BorrowStatus::Returned => {
                    return Err(closed_request(&current));
                }
            }
            debug!(%request_id, "conditional video write lost a race; re-reading");
        }
        Err(concurrent_change(request_id))
    }

    /// Confirm the item changed hands: `approved` to `active`.
    pub async fn confirm_handoff(
        &self,
        request_id: &Uuid,
        actor_id: &UserId,
    ) -> Result<BorrowOutcome, Error> {
        let current = self.require_participant(request_id, actor_id).await?;
        match current.status {
            BorrowStatus::Approved => {}
            BorrowStatus::Pending => return Err(not_yet_approved(&current)),
            BorrowStatus::Active | BorrowStatus::Declined | BorrowStatus::Returned => {
                return Err(closed_request(&current));
            }
        }
        let updated = self
            .requests
            .transition(
                request_id,
                &[BorrowStatus::Approved],
                BorrowStatus::Active,
                self.clock.utc(),
            )
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| concurrent_change(request_id))?;
        info!(%request_id, actor = %actor_id, "borrow handoff confirmed");
        Ok(BorrowOutcome {
            request: updated,
            warnings: Vec::new(),
        })
    }

    /// Close the loan; only the lender or borrower may do so.
    pub async fn mark_returned(
        &self,
        request_id: &Uuid,
        actor_id: &UserId,
    ) -> Result<BorrowOutcome, Error> {
        let current = self.require_participant(request_id, actor_id).await?;
        match current.status {
            BorrowStatus::Approved | BorrowStatus::Active => {}
            BorrowStatus::Pending => return Err(not_yet_approved(&current)),
            BorrowStatus::Declined | BorrowStatus::Returned => return Err(closed_request(&current)),
        }
        let updated = self
            .requests
            .transition(
                request_id,
                &[BorrowStatus::Approved, BorrowStatus::Active],
                BorrowStatus::Returned,
                self.clock.utc(),
            )
            .await
            .map_err(map_repository_error)?;
        match updated {
            Some(request) => {
                info!(%request_id, actor = %actor_id, "borrow request returned");
                Ok(BorrowOutcome {
                    request,
                    warnings: Vec::new(),
                })
            }
            None => {
                let latest = self.require_request(request_id).await?;
                Err(closed_request(&latest))
            }
        }
    }

    /// Fetch a request the actor takes part in.
    pub async fn find_for_participant(
        &self,
        request_id: &Uuid,
        actor_id: &UserId,
    ) -> Result<BorrowRequest, Error> {
        self.require_participant(request_id, actor_id).await
    }

    async fn unresolved_reason(&self, token: &ResponseToken) -> Error {
        match self.requests.find_by_token(token).await {
            Ok(None) => Error::not_found("borrow request not found"),
            Ok(Some(request)) => {
                info!(request_id = %request.id, status = %request.status, "approval link reused");
                Error::already_resolved("borrow request has already been answered")
                    .with_details(json!({ "status": request.status.as_str() }))
            }
            Err(error) => map_repository_error(error),
        }
    }

    async fn require_item(&self, item_id: &Uuid) -> Result<ItemSummary, Error> {
        self.items
            .find_item(item_id)
            .await
            .map_err(map_directory_error)?
            .ok_or_else(|| Error::not_found("item not found").with_details(json!({ "itemId": item_id })))
    }

    async fn require_request(&self, request_id: &Uuid) -> Result<BorrowRequest, Error> {
        self.requests
            .find_by_id(request_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("borrow request not found"))
    }

    async fn require_participant(
        &self,
        request_id: &Uuid,
        actor_id: &UserId,
    ) -> Result<BorrowRequest, Error> {
        let request = self.require_request(request_id).await?;
        if request.is_participant(actor_id) {
            Ok(request)
        } else {
            Err(Error::forbidden("only the lender or borrower may act on this request"))
        }
    }

    async fn notify_video_ready(&self, request: &BorrowRequest) -> Vec<NotificationWarning> {
        let mut params = vec![("approval_url", self.links.borrow_approval(&request.response_token))];
        if let Some(video_url) = &request.video_url {
            params.push(("video_url", video_url.clone()));
        }
        self.notify_user(
            &request.lender_id,
            NotificationChannel::Sms,
            NotificationTemplate::BorrowVideoReady,
            &params,
        )
        .await
    }

    async fn contact_for(&self, user_id: &UserId) -> Option<crate::domain::UserContact> {
        match self.users.find_contact(user_id).await {
            Ok(contact) => contact,
            Err(error) => {
                warn!(%error, %user_id, "contact lookup failed");
                None
            }
        }
    }

    async fn notify_user(
        &self,
        user_id: &UserId,
        preferred: NotificationChannel,
        template: NotificationTemplate,
        params: &[(&str, String)],
    ) -> Vec<NotificationWarning> {
        let route = self
            .contact_for(user_id)
            .await
            .and_then(|contact| route_for(&contact, preferred));
        let Some((channel, recipient)) = route else {
            return vec![unreachable_recipient(template, preferred)];
        };
        let notification = params
            .iter()
            .fold(Notification::new(channel, recipient, template), |acc, (key, value)| {
                acc.param(key, value.clone())
            });
        dispatch_best_effort(self.notifier.as_ref(), notification)
            .await
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
#[path = "borrow_service_tests.rs"]
mod tests;
