//! Notification vocabulary and best-effort dispatch.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use super::ports::{DeliveryError, Notifier};

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Sms,
    Email,
}

impl NotificationChannel {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

/// Message templates known to the delivery gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// Lender is asked to approve or decline; carries the approval URL.
    BorrowRequested,
    /// Borrower learns the request was approved.
    BorrowApproved,
    /// Borrower learns the request was declined.
    BorrowDeclined,
    /// Lender learns the handoff video is ready; carries the approval URL.
    BorrowVideoReady,
    /// Invitee receives a membership invitation link.
    InvitationIssued,
}

impl NotificationTemplate {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BorrowRequested => "borrow_requested",
            Self::BorrowApproved => "borrow_approved",
            Self::BorrowDeclined => "borrow_declined",
            Self::BorrowVideoReady => "borrow_video_ready",
            Self::InvitationIssued => "invitation_issued",
        }
    }
}

/// Template parameters, ordered for stable rendering.
pub type NotificationParams = BTreeMap<String, String>;

/// Gateway acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Provider message reference, when the gateway returns one.
    pub reference: Option<String>,
}

/// Non-fatal delivery failure reported next to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationWarning {
    pub template: NotificationTemplate,
    pub channel: NotificationChannel,
    pub message: String,
}

/// A message ready to hand to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub template: NotificationTemplate,
    pub params: NotificationParams,
}

impl Notification {
    /// Start a notification with no parameters.
    pub fn new(
        channel: NotificationChannel,
        recipient: impl Into<String>,
        template: NotificationTemplate,
    ) -> Self {
        Self {
            channel,
            recipient: recipient.into(),
            template,
            params: NotificationParams::new(),
        }
    }

    /// Add a template parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_owned(), value.into());
        self
    }
}

/// Deliver `notification`, converting failure into a warning.
///
/// The triggering transition has already committed when this runs, so a
/// delivery failure is logged and returned, never propagated.
pub async fn dispatch_best_effort(
    notifier: &dyn Notifier,
    notification: Notification,
) -> Option<NotificationWarning> {
    let Notification {
        channel,
        recipient,
        template,
        params,
    } = notification;
    match notifier.notify(channel, &recipient, template, &params).await {
        Ok(receipt) => {
            info!(
                channel = channel.as_str(),
                template = template.as_str(),
                reference = receipt.reference.as_deref(),
                "notification dispatched"
            );
            None
        }
        Err(error) => {
            warn!(
                channel = channel.as_str(),
                template = template.as_str(),
                %error,
                "notification delivery failed"
            );
            Some(NotificationWarning {
                template,
                channel,
                message: delivery_warning_message(&error),
            })
        }
    }
}

/// Warning raised when a recipient has no usable address.
#[must_use]
pub fn unreachable_recipient(
    template: NotificationTemplate,
    channel: NotificationChannel,
) -> NotificationWarning {
    warn!(
        template = template.as_str(),
        "recipient has no contact address; notification skipped"
    );
    NotificationWarning {
        template,
        channel,
        message: "recipient has no contact address".to_owned(),
    }
}

fn delivery_warning_message(error: &DeliveryError) -> String {
    match error {
        DeliveryError::Rejected { .. } => "notification was rejected by the gateway".to_owned(),
        DeliveryError::Transport { .. } => "notification gateway unavailable".to_owned(),
    }
}
