//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic by not deriving `ToSchema`; these
//! wrappers mirror them for documentation only.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No session, or the session is not valid.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Signed in but not permitted.
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    /// The change clashes with current state.
    #[schema(rename = "conflict")]
    Conflict,
    /// A capability or response token failed verification.
    #[schema(rename = "invalid_token")]
    InvalidToken,
    /// The link or invitation has lapsed.
    #[schema(rename = "expired")]
    Expired,
    /// The request was already answered.
    #[schema(rename = "already_resolved")]
    AlreadyResolved,
    /// A backing store is unreachable; retry later.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "returnBy must be a date")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// Field-level context such as `{"field": "email", "code": "invalid_email"}`.
    details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[test]
    fn schemas_are_registered_under_domain_names() {
        // utoipa replaces :: with . in schema names
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
    }

    #[test]
    fn error_schema_uses_wire_field_names() {
        let schema_json = schema_to_json::<ErrorSchema>();
        assert!(schema_json.contains("traceId"), "missing traceId: {schema_json}");
        assert!(schema_json.contains("details"));
    }

    #[rstest]
    #[case(crate::domain::ErrorCode::InvalidRequest)]
    #[case(crate::domain::ErrorCode::Unauthorized)]
    #[case(crate::domain::ErrorCode::Forbidden)]
    #[case(crate::domain::ErrorCode::NotFound)]
    #[case(crate::domain::ErrorCode::Conflict)]
    #[case(crate::domain::ErrorCode::InvalidToken)]
    #[case(crate::domain::ErrorCode::Expired)]
    #[case(crate::domain::ErrorCode::AlreadyResolved)]
    #[case(crate::domain::ErrorCode::ServiceUnavailable)]
    #[case(crate::domain::ErrorCode::InternalError)]
    fn every_domain_code_is_documented(#[case] code: crate::domain::ErrorCode) {
        let schema_json = schema_to_json::<ErrorCodeSchema>();
        assert!(
            schema_json.contains(&format!("\"{}\"", code.as_str())),
            "missing {}",
            code.as_str()
        );
    }
}
