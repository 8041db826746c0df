//! Borrow request handlers for signed-in participants.
//!
//! ```text
//! POST /api/v1/borrow-requests {"itemId":"…","message":"…","returnBy":"2026-05-08"}
//! GET /api/v1/borrow-requests/{id}
//! POST /api/v1/borrow-requests/{id}/handoff
//! POST /api/v1/borrow-requests/{id}/return
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BorrowOutcome, BorrowRequest, NotificationWarning};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::AuthenticatedUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_date, parse_uuid, require};

const ITEM_ID: FieldName = FieldName::new("itemId");
const RETURN_BY: FieldName = FieldName::new("returnBy");
const REQUEST_ID: FieldName = FieldName::new("id");

/// Request payload for opening a borrow request.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrowRequestBody {
    pub item_id: Option<String>,
    pub message: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    pub return_by: Option<String>,
}

/// Borrow request as seen by its participants.
///
/// The response token is never echoed; it only travels in the lender's
/// notification.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequestResponse {
    pub id: String,
    pub item_id: String,
    pub borrower_id: String,
    pub lender_id: String,
    #[schema(example = "pending")]
    pub status: String,
    pub request_message: String,
    pub requested_return_date: String,
    pub video_url: Option<String>,
    pub approved_at: Option<String>,
    pub activated_at: Option<String>,
    pub returned_at: Option<String>,
    pub created_at: String,
}

impl From<BorrowRequest> for BorrowRequestResponse {
    fn from(value: BorrowRequest) -> Self {
        Self {
            id: value.id.to_string(),
            item_id: value.item_id.to_string(),
            borrower_id: value.borrower_id.to_string(),
            lender_id: value.lender_id.to_string(),
            status: value.status.as_str().to_owned(),
            request_message: value.request_message,
            requested_return_date: value.requested_return_date.to_string(),
            video_url: value.video_url,
            approved_at: value.approved_at.map(|at| at.to_rfc3339()),
            activated_at: value.activated_at.map(|at| at.to_rfc3339()),
            returned_at: value.returned_at.map(|at| at.to_rfc3339()),
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Notification that could not be delivered.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WarningResponse {
    #[schema(example = "borrow_requested")]
    pub template: String,
    #[schema(example = "sms")]
    pub channel: String,
    pub message: String,
}

impl From<NotificationWarning> for WarningResponse {
    fn from(value: NotificationWarning) -> Self {
        Self {
            template: value.template.as_str().to_owned(),
            channel: value.channel.as_str().to_owned(),
            message: value.message,
        }
    }
}

/// A borrow request after a state change, plus delivery warnings.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowOutcomeResponse {
    pub request: BorrowRequestResponse,
    pub warnings: Vec<WarningResponse>,
}

impl From<BorrowOutcome> for BorrowOutcomeResponse {
    fn from(value: BorrowOutcome) -> Self {
        Self {
            request: value.request.into(),
            warnings: value.warnings.into_iter().map(Into::into).collect(),
        }
    }
}

/// Open a borrow request for an item.
#[utoipa::path(
    post,
    path = "/api/v1/borrow-requests",
    request_body = CreateBorrowRequestBody,
    responses(
        (status = 201, description = "Request opened", body = BorrowOutcomeResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Item not found", body = ErrorSchema),
        (status = 409, description = "Item unavailable or own item", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["borrowing"],
    operation_id = "createBorrowRequest"
)]
#[post("/borrow-requests")]
pub async fn create_borrow_request(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<CreateBorrowRequestBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let item_id = parse_uuid(require(body.item_id, ITEM_ID)?, ITEM_ID)?;
    let return_by = parse_date(require(body.return_by, RETURN_BY)?, RETURN_BY)?;
    let message = body.message.unwrap_or_default();

    let outcome = state
        .borrows
        .create(*user.id(), item_id, &message, return_by)
        .await?;
    Ok(HttpResponse::Created().json(BorrowOutcomeResponse::from(outcome)))
}

/// Fetch a borrow request the caller takes part in.
#[utoipa::path(
    get,
    path = "/api/v1/borrow-requests/{id}",
    params(("id" = String, Path, description = "Borrow request id")),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequestResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["borrowing"],
    operation_id = "getBorrowRequest"
)]
#[get("/borrow-requests/{id}")]
pub async fn get_borrow_request(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<BorrowRequestResponse>> {
    let id = parse_uuid(path.into_inner(), REQUEST_ID)?;
    let request = state.borrows.find_for_participant(&id, user.id()).await?;
    Ok(web::Json(request.into()))
}

/// Confirm the item changed hands.
#[utoipa::path(
    post,
    path = "/api/v1/borrow-requests/{id}/handoff",
    params(("id" = String, Path, description = "Borrow request id")),
    responses(
        (status = 200, description = "Loan is active", body = BorrowOutcomeResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a participant", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Request not approved or already closed", body = ErrorSchema)
    ),
    tags = ["borrowing"],
    operation_id = "confirmHandoff"
)]
#[post("/borrow-requests/{id}/handoff")]
pub async fn confirm_handoff(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<BorrowOutcomeResponse>> {
    let id = parse_uuid(path.into_inner(), REQUEST_ID)?;
    let outcome = state.borrows.confirm_handoff(&id, user.id()).await?;
    Ok(web::Json(outcome.into()))
}

/// Record the item as returned.
#[utoipa::path(
    post,
    path = "/api/v1/borrow-requests/{id}/return",
    params(("id" = String, Path, description = "Borrow request id")),
    responses(
        (status = 200, description = "Loan closed", body = BorrowOutcomeResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a participant", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Loan not active", body = ErrorSchema)
    ),
    tags = ["borrowing"],
    operation_id = "markReturned"
)]
#[post("/borrow-requests/{id}/return")]
pub async fn mark_returned(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<BorrowOutcomeResponse>> {
    let id = parse_uuid(path.into_inner(), REQUEST_ID)?;
    let outcome = state.borrows.mark_returned(&id, user.id()).await?;
    Ok(web::Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{login_request, session_cookie};
    use crate::outbound::memory::DEV_ITEM_ID;
    use crate::test_support::LendingHarness;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn requires_a_session() {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/borrow-requests")
                .set_json(json!({ "itemId": DEV_ITEM_ID, "returnBy": "2026-05-08" }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn borrower_opens_and_reads_a_request() {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let login =
            actix_test::call_service(&app, login_request("borrower@example.org").to_request()).await;
        let cookie = session_cookie(&login);

        let created = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/borrow-requests")
                .cookie(cookie.clone())
                .set_json(json!({
                    "itemId": DEV_ITEM_ID,
                    "message": "Weekend shelves",
                    "returnBy": "2026-05-08"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(created).await;
        assert_eq!(body["request"]["status"], "pending");
        assert!(body["request"].get("responseToken").is_none());
        assert_eq!(body["warnings"], json!([]));
        let id = body["request"]["id"].as_str().expect("id").to_owned();

        let fetched = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/borrow-requests/{id}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(fetched.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(fetched).await;
        assert_eq!(body["requestMessage"], "Weekend shelves");
        assert_eq!(body["requestedReturnDate"], "2026-05-08");
    }

    #[actix_web::test]
    async fn lender_cannot_borrow_their_own_item() {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let login =
            actix_test::call_service(&app, login_request("lender@example.org").to_request()).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/borrow-requests")
                .cookie(session_cookie(&login))
                .set_json(json!({ "itemId": DEV_ITEM_ID, "returnBy": "2026-05-08" }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["code"], "self_borrow");
    }

    #[actix_web::test]
    async fn malformed_fields_are_rejected_before_the_service() {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let login =
            actix_test::call_service(&app, login_request("borrower@example.org").to_request()).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/borrow-requests")
                .cookie(session_cookie(&login))
                .set_json(json!({ "itemId": DEV_ITEM_ID, "returnBy": "next week" }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["field"], "returnBy");
        assert_eq!(body["details"]["code"], "invalid_date");
    }

    #[actix_web::test]
    async fn handoff_before_approval_conflicts() {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let login =
            actix_test::call_service(&app, login_request("borrower@example.org").to_request()).await;
        let cookie = session_cookie(&login);
        let created = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/borrow-requests")
                .cookie(cookie.clone())
                .set_json(json!({ "itemId": DEV_ITEM_ID, "returnBy": "2026-05-08" }))
                .to_request(),
        )
        .await;
        let body: Value = actix_test::read_body_json(created).await;
        let id = body["request"]["id"].as_str().expect("id").to_owned();

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/borrow-requests/{id}/handoff"))
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
