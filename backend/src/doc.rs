//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every HTTP handler's `#[utoipa::path]` plus the error
//! schema wrappers from [`crate::inbound::http::schemas`]. Swagger UI serves
//! it in debug builds and `openapi-dump` prints it for tooling.

use crate::inbound::http::borrow_approval::BorrowApprovalResponse;
use crate::inbound::http::borrow_requests::{BorrowOutcomeResponse, BorrowRequestResponse};
use crate::inbound::http::collections::OwnershipTransferResponse;
use crate::inbound::http::feedback::VoteTallyResponse;
use crate::inbound::http::invitations::{InvitationOutcomeResponse, InvitationResponse};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Adds the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the lending API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Neighbourly lending API",
        description = "Borrow requests, collection invitations and membership, feedback votes, \
                       and the video provider webhook."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::borrow_requests::create_borrow_request,
        crate::inbound::http::borrow_requests::get_borrow_request,
        crate::inbound::http::borrow_requests::confirm_handoff,
        crate::inbound::http::borrow_requests::mark_returned,
        crate::inbound::http::borrow_approval::view_approval,
        crate::inbound::http::borrow_approval::respond,
        crate::inbound::http::invitations::create_invitation,
        crate::inbound::http::invitations::open_library_invite,
        crate::inbound::http::invitations::open_branch_invite,
        crate::inbound::http::invitations::consume_invite,
        crate::inbound::http::collections::transfer_ownership,
        crate::inbound::http::feedback::upvote,
        crate::inbound::http::feedback::attribution_slug,
        crate::inbound::http::feedback::resolve_attribution,
        crate::inbound::http::generation_results::poll_result,
        crate::inbound::http::webhooks::video_ready,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        BorrowRequestResponse,
        BorrowOutcomeResponse,
        BorrowApprovalResponse,
        InvitationResponse,
        InvitationOutcomeResponse,
        OwnershipTransferResponse,
        VoteTallyResponse
    )),
    tags(
        (name = "session", description = "Sign in and out"),
        (name = "borrowing", description = "Borrow requests and the lender's approval link"),
        (name = "invitations", description = "Collection invitations and the cookie handoff"),
        (name = "collections", description = "Collection ownership"),
        (name = "feedback", description = "Feedback votes and attribution"),
        (name = "results", description = "Polling for asynchronously generated results"),
        (name = "webhooks", description = "Provider callbacks"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[rstest]
    #[case("/api/v1/borrow-requests")]
    #[case("/borrow-approval/{token}")]
    #[case("/invite/{token}")]
    #[case("/invitations/{token}")]
    #[case("/invite/consume")]
    #[case("/api/v1/collections/{id}/owner")]
    #[case("/api/v1/feedback/{issue}/votes")]
    #[case("/webhooks/video")]
    #[case("/health/ready")]
    fn documents_path(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }
}
