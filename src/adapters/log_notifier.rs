//! Notification adapter that records triggered alerts in the log.

use async_trait::async_trait;

use crate::domain::alert::AlertTriggered;
use crate::ports::notification_port::{NotificationPort, NotifyError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(&self, event: &AlertTriggered) -> Result<(), NotifyError> {
        tracing::info!(
            account = %event.account_id,
            symbol = %event.symbol,
            current_price = %event.current_price,
            target_price = %event.target_price,
            "price alert triggered"
        );
        Ok(())
    }
}
