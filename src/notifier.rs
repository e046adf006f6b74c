use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::provider::{NotificationProvider, TopicHandle};

pub const ERROR_SUBJECT: &str = "Error Notification: EC2 Monitoring";

/// Sends error alerts to the error topic.
///
/// Delivery is best-effort: a failure to publish is logged and dropped so a
/// broken notification channel can never trigger further notifications.
#[derive(Clone)]
pub struct Notifier {
    provider: Arc<dyn NotificationProvider>,
    error_topic: TopicHandle,
}

impl Notifier {
    pub fn new(provider: Arc<dyn NotificationProvider>, error_topic: TopicHandle) -> Self {
        Self {
            provider,
            error_topic,
        }
    }

    pub fn error_topic(&self) -> &TopicHandle {
        &self.error_topic
    }

    #[instrument(skip(self, message))]
    pub async fn notify(&self, message: &str) {
        match self
            .provider
            .publish(&self.error_topic, ERROR_SUBJECT, message)
            .await
        {
            Ok(()) => info!("error notification sent to stakeholders"),
            Err(e) => error!("failed to send error notification: {e}"),
        }
    }
}
