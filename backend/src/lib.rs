//! Neighbourly lending backend.
//!
//! The [`domain`] holds the lending rules behind ports; [`inbound`] and
//! [`outbound`] adapt HTTP, Postgres, Redis and the notification gateway to
//! them.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
