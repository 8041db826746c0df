//! Notifier that writes deliveries to the log.

use async_trait::async_trait;
use tracing::info;

use crate::domain::notification::{
    DeliveryReceipt, NotificationChannel, NotificationParams, NotificationTemplate,
};
use crate::domain::ports::{DeliveryError, Notifier};

/// Development notifier: every message is accepted and logged.
///
/// Recipients and parameters are not logged since they carry contact details
/// and capability links.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        channel: NotificationChannel,
        _recipient: &str,
        template: NotificationTemplate,
        params: &NotificationParams,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        info!(
            channel = channel.as_str(),
            template = template.as_str(),
            params = params.len(),
            "notification logged instead of sent"
        );
        Ok(DeliveryReceipt::default())
    }
}
