//! Outbound alert notifications.

use async_trait::async_trait;

use crate::domain::alert::AlertTriggered;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("notification delivery failed: {reason}")]
pub struct NotifyError {
    pub reason: String,
}

/// Delivery channel for triggered alerts (mail, chat, log...).
///
/// A failed delivery is reported back but never re-arms the alert.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, event: &AlertTriggered) -> Result<(), NotifyError>;
}
