//! Collection ownership handler.
//!
//! ```text
//! POST /api/v1/collections/{id}/owner {"newOwnerId":"…"}
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{OwnershipTransfer, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::AuthenticatedUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid, require};

const COLLECTION_ID: FieldName = FieldName::new("id");
const NEW_OWNER_ID: FieldName = FieldName::new("newOwnerId");

/// Request payload naming the next owner.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwnershipRequest {
    pub new_owner_id: Option<String>,
}

/// Completed hand-over.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipTransferResponse {
    pub collection_id: String,
    pub previous_owner_id: String,
    pub new_owner_id: String,
}

impl From<OwnershipTransfer> for OwnershipTransferResponse {
    fn from(value: OwnershipTransfer) -> Self {
        Self {
            collection_id: value.collection_id.to_string(),
            previous_owner_id: value.previous_owner.to_string(),
            new_owner_id: value.new_owner.to_string(),
        }
    }
}

/// Hand a collection to one of its active members.
///
/// The previous owner stays on as an active admin. Either both changes land
/// or neither does.
#[utoipa::path(
    post,
    path = "/api/v1/collections/{id}/owner",
    params(("id" = String, Path, description = "Collection id")),
    request_body = TransferOwnershipRequest,
    responses(
        (status = 200, description = "Ownership transferred", body = OwnershipTransferResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Caller is not the owner", body = ErrorSchema),
        (status = 404, description = "Collection not found", body = ErrorSchema),
        (status = 409, description = "New owner is not an active member, or ownership changed", body = ErrorSchema)
    ),
    tags = ["collections"],
    operation_id = "transferOwnership"
)]
#[post("/collections/{id}/owner")]
pub async fn transfer_ownership(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    payload: web::Json<TransferOwnershipRequest>,
) -> ApiResult<web::Json<OwnershipTransferResponse>> {
    let collection_id = parse_uuid(path.into_inner(), COLLECTION_ID)?;
    let new_owner = parse_uuid(
        require(payload.into_inner().new_owner_id, NEW_OWNER_ID)?,
        NEW_OWNER_ID,
    )
    .map(UserId::from_uuid)?;

    let transfer = state
        .collections
        .transfer_ownership(&collection_id, user.id(), &new_owner)
        .await?;
    Ok(web::Json(transfer.into()))
}
