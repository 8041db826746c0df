//! Video provider webhook receiver.
//!
//! Every delivery is acknowledged with `200 OK` so the provider stops
//! retrying; the outcome is only visible in the logs.

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::video_webhook::SIGNATURE_HEADER;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAckResponse {
    #[schema(example = true)]
    pub ok: bool,
}

/// Receive a signed video-ready event.
#[utoipa::path(
    post,
    path = "/webhooks/video",
    request_body(content = String, content_type = "application/json", description = "Raw signed event body"),
    params(("mux-signature" = String, Header, description = "`t=<unix>,v1=<hex hmac>`")),
    responses((status = 200, description = "Delivery acknowledged", body = WebhookAckResponse)),
    tags = ["webhooks"],
    operation_id = "videoReadyWebhook",
    security([])
)]
#[post("/webhooks/video")]
pub async fn video_ready(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    state.webhooks.on_video_ready(signature, &body).await;
    HttpResponse::Ok().json(WebhookAckResponse { ok: true })
}
