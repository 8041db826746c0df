//! Outbound delivery of SMS and email messages.
//!
//! The core never blocks a state transition on delivery: callers go through
//! [`crate::domain::notification::dispatch_best_effort`], which turns a
//! [`DeliveryError`] into a logged warning.

use async_trait::async_trait;

use crate::domain::notification::{
    DeliveryReceipt, NotificationChannel, NotificationParams, NotificationTemplate,
};

use super::define_port_error;

define_port_error! {
    /// Reasons a notification was not delivered.
    pub enum DeliveryError {
        /// The gateway refused the message.
        Rejected { message: String } => "notification rejected: {message}",
        /// The gateway could not be reached.
        Transport { message: String } => "notification transport failed: {message}",
    }
}

/// Port for SMS and email delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `template` rendered with `params` to `recipient`.
    async fn notify(
        &self,
        channel: NotificationChannel,
        recipient: &str,
        template: NotificationTemplate,
        params: &NotificationParams,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}
