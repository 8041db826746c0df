//! Polling endpoint for asynchronously generated results.
//!
//! ```text
//! GET /api/v1/generation-results/{id}
//! ```

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Poll state for one generation id.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResultResponse {
    pub id: String,
    /// Whether a result has been published and is still live.
    pub ready: bool,
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
}

/// Fetch a published result, or `ready: false` while it is pending.
#[utoipa::path(
    get,
    path = "/api/v1/generation-results/{id}",
    params(("id" = String, Path, description = "Generation id handed to the client")),
    responses(
        (status = 200, description = "Poll state", body = GenerationResultResponse),
        (status = 400, description = "Malformed id", body = ErrorSchema),
        (status = 503, description = "Result store unavailable", body = ErrorSchema)
    ),
    tags = ["results"],
    operation_id = "pollGenerationResult"
)]
#[get("/generation-results/{id}")]
pub async fn poll_result(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let result = state.results.poll(&id).await?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(GenerationResultResponse {
            id,
            ready: result.is_some(),
            result,
        }))
}
