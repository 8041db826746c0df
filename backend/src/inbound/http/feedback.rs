//! Feedback voting and attribution handlers.
//!
//! ```text
//! POST /api/v1/feedback/{issue}/votes
//! GET /api/v1/feedback/attribution
//! GET /api/v1/feedback/attribution/{slug}
//! ```

use actix_web::{get, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{IssueNumber, VoteTally};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::AuthenticatedUser;
use crate::inbound::http::state::HttpState;

/// Voter count after an upvote.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteTallyResponse {
    #[schema(example = 42)]
    pub issue_number: u32,
    /// Distinct users who voted for the issue.
    pub voters: u64,
    /// False when the caller had already voted.
    pub newly_recorded: bool,
}

impl From<VoteTally> for VoteTallyResponse {
    fn from(value: VoteTally) -> Self {
        Self {
            issue_number: value.issue_number.get(),
            voters: value.voters,
            newly_recorded: value.newly_recorded,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributionSlugResponse {
    pub slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttributionResponse {
    pub user_id: String,
}

/// Upvote a feedback issue. Repeat votes are accepted and change nothing.
#[utoipa::path(
    post,
    path = "/api/v1/feedback/{issue}/votes",
    params(("issue" = u32, Path, description = "Issue number")),
    responses(
        (status = 200, description = "Vote recorded or already present", body = VoteTallyResponse),
        (status = 400, description = "Invalid issue number", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["feedback"],
    operation_id = "upvoteFeedback"
)]
#[post("/feedback/{issue}/votes")]
pub async fn upvote(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<u32>,
) -> ApiResult<web::Json<VoteTallyResponse>> {
    let issue_number = IssueNumber::new(path.into_inner())?;
    let tally = state.feedback.upvote(issue_number, *user.id()).await?;
    Ok(web::Json(tally.into()))
}

/// Signed slug attributing feedback to the current user.
#[utoipa::path(
    get,
    path = "/api/v1/feedback/attribution",
    responses(
        (status = 200, description = "Attribution slug", body = AttributionSlugResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["feedback"],
    operation_id = "feedbackAttributionSlug"
)]
#[get("/feedback/attribution")]
pub async fn attribution_slug(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
) -> ApiResult<web::Json<AttributionSlugResponse>> {
    let slug = state.feedback.attribution_slug(user.id())?;
    Ok(web::Json(AttributionSlugResponse { slug }))
}

/// Resolve an attribution slug to the user it names.
#[utoipa::path(
    get,
    path = "/api/v1/feedback/attribution/{slug}",
    params(("slug" = String, Path, description = "Attribution slug")),
    responses(
        (status = 200, description = "Attributed user", body = AttributionResponse),
        (status = 400, description = "Slug is not valid", body = ErrorSchema)
    ),
    tags = ["feedback"],
    operation_id = "resolveFeedbackAttribution",
    security([])
)]
#[get("/feedback/attribution/{slug}")]
pub async fn resolve_attribution(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<AttributionResponse>> {
    let user_id = state.feedback.resolve_attribution(&path.into_inner())?;
    Ok(web::Json(AttributionResponse {
        user_id: user_id.to_string(),
    }))
}
