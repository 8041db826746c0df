//! Notification delivery adapters.
//!
//! - [`HttpNotificationGateway`] posts each message to an SMS/email gateway.
//! - [`LoggingNotifier`] only logs; used when no gateway is configured.

mod http_gateway;
mod logging;

pub use http_gateway::{GatewayBuildError, GatewayIdentity, HttpNotificationGateway};
pub use logging::LoggingNotifier;
