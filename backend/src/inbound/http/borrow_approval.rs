//! Public approval page backing the lender's SMS link.
//!
//! Possession of the response token is the only authority here, so these
//! routes sit outside the session scope.
//!
//! ```text
//! GET /borrow-approval/{token}
//! POST /borrow-approval/{token} {"decision":"approve"}
//! ```

use actix_web::{HttpResponse, get, http::header, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BorrowApprovalView, BorrowDecision};
use crate::inbound::http::ApiResult;
use crate::inbound::http::borrow_requests::BorrowOutcomeResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, require};

const DECISION: FieldName = FieldName::new("decision");

/// What the lender sees before deciding.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowApprovalResponse {
    pub request_id: String,
    pub item_title: String,
    pub borrower_name: String,
    #[schema(example = "pending")]
    pub status: String,
    pub request_message: String,
    pub requested_return_date: String,
    pub video_url: Option<String>,
}

impl From<BorrowApprovalView> for BorrowApprovalResponse {
    fn from(value: BorrowApprovalView) -> Self {
        Self {
            request_id: value.request_id.to_string(),
            item_title: value.item_title,
            borrower_name: value.borrower_name,
            status: value.status.as_str().to_owned(),
            request_message: value.request_message,
            requested_return_date: value.requested_return_date.to_string(),
            video_url: value.video_url,
        }
    }
}

/// Lender's decision.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondRequest {
    /// `approve` or `decline`.
    #[schema(example = "approve")]
    pub decision: Option<String>,
}

fn parse_decision(raw: String) -> Result<BorrowDecision, crate::domain::Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approve" => Ok(BorrowDecision::Approve),
        "decline" => Ok(BorrowDecision::Decline),
        _ => Err(invalid_value_error(DECISION, &raw, "approve, decline")),
    }
}

/// Show a borrow request to the holder of its response token.
#[utoipa::path(
    get,
    path = "/borrow-approval/{token}",
    params(("token" = String, Path, description = "Response token from the lender's link")),
    responses(
        (status = 200, description = "Approval view", body = BorrowApprovalResponse),
        (status = 400, description = "Malformed token", body = ErrorSchema),
        (status = 404, description = "Unknown token", body = ErrorSchema)
    ),
    tags = ["borrowing"],
    operation_id = "viewBorrowApproval",
    security([])
)]
#[get("/borrow-approval/{token}")]
pub async fn view_approval(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let view = state.borrows.view_by_token(&path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .insert_header((header::REFERRER_POLICY, "no-referrer"))
        .json(BorrowApprovalResponse::from(view)))
}

/// Approve or decline a pending borrow request.
#[utoipa::path(
    post,
    path = "/borrow-approval/{token}",
    params(("token" = String, Path, description = "Response token from the lender's link")),
    request_body = RespondRequest,
    responses(
        (status = 200, description = "Decision recorded", body = BorrowOutcomeResponse),
        (status = 400, description = "Malformed token or decision", body = ErrorSchema),
        (status = 404, description = "Unknown token", body = ErrorSchema),
        (status = 409, description = "Already answered", body = ErrorSchema)
    ),
    tags = ["borrowing"],
    operation_id = "respondToBorrowRequest",
    security([])
)]
#[post("/borrow-approval/{token}")]
pub async fn respond(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RespondRequest>,
) -> ApiResult<web::Json<BorrowOutcomeResponse>> {
    let decision = parse_decision(require(payload.into_inner().decision, DECISION)?)?;
    let outcome = state.borrows.respond(&path.into_inner(), decision).await?;
    Ok(web::Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FIXTURE_BORROWER;
    use crate::domain::{NotificationChannel, NotificationTemplate};
    use crate::outbound::memory::DEV_ITEM_ID;
    use crate::test_support::LendingHarness;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::NaiveDate;
    use rstest::rstest;
    use serde_json::{Value, json};

    async fn open_request(harness: &LendingHarness) -> String {
        let return_by = NaiveDate::from_ymd_opt(2026, 5, 8).expect("date");
        let outcome = harness
            .state
            .borrows
            .create(FIXTURE_BORROWER.user_id, DEV_ITEM_ID, "", return_by)
            .await
            .expect("request opened");
        let sms = harness
            .notifier
            .sent()
            .into_iter()
            .find(|n| n.template == NotificationTemplate::BorrowRequested)
            .expect("lender notified");
        assert_eq!(sms.channel, NotificationChannel::Sms);
        outcome.request.response_token.as_str().to_owned()
    }

    #[rstest]
    #[case("approve", true)]
    #[case("Decline", true)]
    #[case("maybe", false)]
    fn decisions_parse(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(parse_decision(raw.to_owned()).is_ok(), ok);
    }

    #[actix_web::test]
    async fn token_holder_sees_and_answers_the_request_once() {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let token = open_request(&harness).await;

        let view = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/borrow-approval/{token}"))
                .to_request(),
        )
        .await;
        assert_eq!(view.status(), StatusCode::OK);
        assert_eq!(
            view.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
        let body: Value = actix_test::read_body_json(view).await;
        assert_eq!(body["itemTitle"], "Cordless drill");
        assert_eq!(body["borrowerName"], "Bo Borrower");
        assert_eq!(body["status"], "pending");

        let approve = || {
            actix_test::TestRequest::post()
                .uri(&format!("/borrow-approval/{token}"))
                .set_json(json!({ "decision": "approve" }))
                .to_request()
        };
        let first = actix_test::call_service(&app, approve()).await;
        assert_eq!(first.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(first).await;
        assert_eq!(body["request"]["status"], "approved");

        let second = actix_test::call_service(&app, approve()).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(second).await;
        assert_eq!(body["code"], "already_resolved");
    }

    #[rstest]
    #[case("short", StatusCode::BAD_REQUEST)]
    #[case(
        "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        StatusCode::NOT_FOUND
    )]
    #[actix_web::test]
    async fn unknown_tokens_are_rejected(#[case] token: &str, #[case] expected: StatusCode) {
        let harness = LendingHarness::new();
        let app = actix_test::init_service(harness.app()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/borrow-approval/{token}"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), expected);
    }
}
