//! Invitation handlers.
//!
//! Opening an invitation link never redeems it. The link stores the token in
//! signed cookies and sends the browser to login; the client then calls
//! `POST /invite/consume` with its session to finish the redemption.
//!
//! ```text
//! POST /api/v1/invitations {"kind":"library","email":"…","targetId":"…"}
//! GET /invite/{token}
//! GET /invitations/{token}
//! POST /invite/consume
//! ```

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::domain::{Error, ErrorCode, Invitation, InvitationKind, InvitationOutcome};
use crate::inbound::http::ApiResult;
use crate::inbound::http::borrow_requests::WarningResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::AuthenticatedUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, parse_uuid, require};

const KIND: FieldName = FieldName::new("kind");
const EMAIL: FieldName = FieldName::new("email");
const TARGET_ID: FieldName = FieldName::new("targetId");

/// Login page with a pending invitation waiting in cookies.
pub const LOGIN_PENDING: &str = "/login?invite=pending";
/// Login page explaining the invitation has expired.
pub const LOGIN_EXPIRED: &str = "/login?invite=expired";
/// Login page explaining the invitation link is not valid.
pub const LOGIN_INVALID: &str = "/login?invite=invalid";

/// Request payload for issuing an invitation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationRequest {
    /// `library` or `branch`.
    #[schema(example = "library")]
    pub kind: Option<String>,
    pub email: Option<String>,
    pub target_id: Option<String>,
}

/// Issued invitation. The token itself only travels by email.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub id: String,
    #[schema(example = "library")]
    pub kind: String,
    #[schema(example = "sent")]
    pub status: String,
    pub target_id: String,
    pub expires_at: String,
}

impl From<Invitation> for InvitationResponse {
    fn from(value: Invitation) -> Self {
        Self {
            id: value.id.to_string(),
            kind: value.kind.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            target_id: value.target_id.to_string(),
            expires_at: value.expires_at.to_rfc3339(),
        }
    }
}

/// Issued invitation plus delivery warnings.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationOutcomeResponse {
    pub invitation: InvitationResponse,
    pub warnings: Vec<WarningResponse>,
}

impl From<InvitationOutcome> for InvitationOutcomeResponse {
    fn from(value: InvitationOutcome) -> Self {
        Self {
            invitation: value.invitation.into(),
            warnings: value.warnings.into_iter().map(Into::into).collect(),
        }
    }
}

/// Where the client should go after consuming a pending invitation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeInviteResponse {
    /// Landing path, or `null` when nothing was redeemed.
    #[schema(example = "/library/3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub redirect: Option<String>,
}

fn parse_kind(raw: String) -> Result<InvitationKind, Error> {
    raw.trim()
        .parse::<InvitationKind>()
        .map_err(|_| invalid_value_error(KIND, &raw, "library, branch"))
}

/// Invite someone to a library or branch by email.
#[utoipa::path(
    post,
    path = "/api/v1/invitations",
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation issued", body = InvitationOutcomeResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Not a library owner or admin", body = ErrorSchema),
        (status = 404, description = "Library not found", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "createInvitation"
)]
#[post("/invitations")]
pub async fn create_invitation(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<CreateInvitationRequest>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let kind = parse_kind(require(body.kind, KIND)?)?;
    let email = require(body.email, EMAIL)?;
    let target_id = parse_uuid(require(body.target_id, TARGET_ID)?, TARGET_ID)?;

    let outcome = state
        .invitations
        .create_invitation(kind, &email, *user.id(), target_id)
        .await?;
    Ok(HttpResponse::Created().json(InvitationOutcomeResponse::from(outcome)))
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

async fn open_invite(state: &HttpState, kind: InvitationKind, token: &str) -> ApiResult<HttpResponse> {
    let target = match state.invitations.preview(token, kind).await {
        Ok(target) => target,
        Err(err) if err.code() == ErrorCode::Expired => return Ok(redirect_to(LOGIN_EXPIRED)),
        Err(err) if err.code() == ErrorCode::InvalidToken => return Ok(redirect_to(LOGIN_INVALID)),
        Err(err) => return Err(err),
    };
    let mut response = HttpResponse::SeeOther();
    response
        .insert_header((header::LOCATION, LOGIN_PENDING))
        .insert_header((header::CACHE_CONTROL, "no-store"));
    for cookie in state
        .invite_cookies
        .pending_cookies(kind, token, &target.target_id)?
    {
        response.cookie(cookie);
    }
    Ok(response.finish())
}

/// Open a library invitation link.
#[utoipa::path(
    get,
    path = "/invite/{token}",
    params(("token" = String, Path, description = "Invitation token from the email")),
    responses(
        (status = 303, description = "Redirect to login; sets pending invitation cookies when valid"),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "openLibraryInvite",
    security([])
)]
#[get("/{token}")]
pub async fn open_library_invite(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    open_invite(&state, InvitationKind::Library, &path.into_inner()).await
}

/// Open a branch invitation link.
#[utoipa::path(
    get,
    path = "/invitations/{token}",
    params(("token" = String, Path, description = "Invitation token from the email")),
    responses(
        (status = 303, description = "Redirect to login; sets pending invitation cookies when valid"),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "openBranchInvite",
    security([])
)]
#[get("/invitations/{token}")]
pub async fn open_branch_invite(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    open_invite(&state, InvitationKind::Branch, &path.into_inner()).await
}

/// Redeem the invitation held in the handoff cookies for the signed-in user.
///
/// The cookies are cleared whatever the outcome; a failed redemption reports
/// `redirect: null`.
#[utoipa::path(
    post,
    path = "/invite/consume",
    responses(
        (status = 200, description = "Pending invitation handled", body = ConsumeInviteResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["invitations"],
    operation_id = "consumeInvite"
)]
#[post("/consume")]
pub async fn consume_invite(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    request: HttpRequest,
) -> HttpResponse {
    let redirect = match state.invite_cookies.read(&request) {
        Some(pending) => match state
            .invitations
            .redeem(&pending.token, pending.kind, user.id(), pending.target_id)
            .await
        {
            Ok(redemption) => {
                info!(user = %user.id(), kind = %pending.kind, "pending invitation consumed");
                Some(redemption.landing_path())
            }
            Err(error) => {
                warn!(code = error.code().as_str(), %error, "pending invitation not redeemed");
                None
            }
        },
        None => None,
    };

    let mut response = HttpResponse::Ok();
    response.insert_header((header::CACHE_CONTROL, "no-store"));
    for cookie in state.invite_cookies.removal_cookies() {
        response.cookie(cookie);
    }
    response.json(ConsumeInviteResponse { redirect })
}
