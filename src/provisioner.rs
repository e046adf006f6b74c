//! One-shot alarm provisioning
//!
//! ```text
//! create topic → subscribe email → put warning + critical alarm per (instance, stat)
//! ```
//!
//! Every step is fatal on failure. Alarm names are deterministic, so running
//! provisioning again replaces the alarms instead of duplicating them.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::error::{MonitorError, MonitorResult, ProviderError};
use crate::notifier::Notifier;
use crate::provider::{AlarmSpec, MetricsProvider, NotificationProvider, Severity, TopicHandle};

/// Protocol used for the recipient subscription
pub const SUBSCRIPTION_PROTOCOL: &str = "email";

/// Warning and critical alarm for every configured (instance, stat) pair
pub fn alarm_specs(config: &Config, topic: &TopicHandle) -> Vec<AlarmSpec> {
    let mut specs = Vec::with_capacity(config.instances.len() * config.stats.len() * 2);

    for instance_id in &config.instances {
        for stat in &config.stats {
            let Some(thresholds) = config.thresholds_for(stat) else {
                warn!("no thresholds for {stat}, skipping alarms on {instance_id}");
                continue;
            };

            specs.push(AlarmSpec::new(
                instance_id,
                stat,
                Severity::Warning,
                thresholds.warning,
                topic.clone(),
            ));
            specs.push(AlarmSpec::new(
                instance_id,
                stat,
                Severity::Critical,
                thresholds.critical,
                topic.clone(),
            ));
        }
    }

    specs
}

pub struct AlertProvisioner {
    config: Arc<Config>,
    metrics: Arc<dyn MetricsProvider>,
    notifications: Arc<dyn NotificationProvider>,
    notifier: Notifier,
}

impl AlertProvisioner {
    pub fn new(
        config: Arc<Config>,
        metrics: Arc<dyn MetricsProvider>,
        notifications: Arc<dyn NotificationProvider>,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            metrics,
            notifications,
            notifier,
        }
    }

    async fn abort(&self, context: String, source: ProviderError) -> MonitorError {
        let err = MonitorError::fatal(context, source);
        error!("{err}");
        self.notifier.notify(&err.to_string()).await;
        err
    }

    /// Provision the alarm topic, its subscription and all alarms.
    ///
    /// Returns the handle of the alarm topic, which the weekly digest is
    /// published to as well.
    #[instrument(skip(self))]
    pub async fn provision(&self) -> MonitorResult<TopicHandle> {
        let topic = match self.notifications.create_topic(&self.config.topic_name).await {
            Ok(topic) => topic,
            Err(e) => {
                return Err(self
                    .abort("error creating notification topic".into(), e)
                    .await);
            }
        };
        debug!("notification topic created: {topic}");

        if let Err(e) = self
            .notifications
            .subscribe(&topic, SUBSCRIPTION_PROTOCOL, &self.config.email)
            .await
        {
            return Err(self
                .abort("error subscribing email to notification topic".into(), e)
                .await);
        }
        debug!("subscribed {} to {topic}", self.config.email);

        for alarm in alarm_specs(&self.config, &topic) {
            if let Err(e) = self.metrics.put_alarm(&alarm).await {
                let context = format!(
                    "error creating alarm for {} on {}",
                    alarm.metric_name, alarm.instance_id
                );
                return Err(self.abort(context, e).await);
            }
            debug!("created alarm {}", alarm.name);
        }

        info!("provisioning complete");
        Ok(topic)
    }
}
