//! Startup and main loop
//!
//! ```text
//! Config → AlertProvisioner (once) → Scheduler
//!                                      ├─ every minute: MetricsCollector → metrics log
//!                                      └─ weekly:       SummaryReporter ← metrics log
//! ```
//!
//! Every component gets the same immutable config and provider handles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::collector::MetricsCollector;
use crate::config::Config;
use crate::error::MonitorResult;
use crate::notifier::Notifier;
use crate::provider::{Providers, TopicHandle};
use crate::provisioner::AlertProvisioner;
use crate::scheduler::{Schedule, Scheduler};
use crate::storage::MetricsLog;
use crate::summary::{SummaryReporter, WeeklySummary};

pub const COLLECT_JOB: &str = "collect_metrics";
pub const SUMMARY_JOB: &str = "weekly_summary";

pub struct Monitor {
    config: Arc<Config>,
    providers: Providers,
    notifier: Notifier,
}

impl Monitor {
    pub fn new(config: Config, providers: Providers) -> Self {
        let notifier = Notifier::new(
            providers.notifications.clone(),
            TopicHandle::new(config.error_topic.clone()),
        );

        Self {
            config: Arc::new(config),
            providers,
            notifier,
        }
    }

    pub fn from_config(config: Config) -> Self {
        let providers = Providers::from_config(&config);
        Self::new(config, providers)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn metrics_log(&self) -> MetricsLog {
        MetricsLog::new(self.config.metrics_file.clone())
    }

    pub async fn provision(&self) -> MonitorResult<TopicHandle> {
        AlertProvisioner::new(
            self.config.clone(),
            self.providers.metrics.clone(),
            self.providers.notifications.clone(),
            self.notifier.clone(),
        )
        .provision()
        .await
    }

    pub fn collector(&self) -> MetricsCollector {
        MetricsCollector::new(
            self.config.clone(),
            self.providers.metrics.clone(),
            self.metrics_log(),
            self.notifier.clone(),
        )
    }

    pub fn reporter(&self) -> SummaryReporter {
        SummaryReporter::new(
            self.config.clone(),
            self.providers.notifications.clone(),
            self.metrics_log(),
            self.notifier.clone(),
        )
    }

    /// Job table with the collection and weekly summary jobs.
    pub fn scheduler(&self, topic: TopicHandle, now: DateTime<Utc>) -> Scheduler {
        let schedule = &self.config.schedule;
        let mut scheduler = Scheduler::new();

        scheduler.add_job(
            COLLECT_JOB,
            Schedule::every_secs(schedule.collect_interval_secs),
            self.collector(),
            now,
        );
        scheduler.add_job(
            SUMMARY_JOB,
            Schedule::Weekly {
                weekday: schedule.summary_weekday,
                time: schedule.summary_time,
            },
            WeeklySummary::new(self.reporter(), topic),
            now,
        );

        scheduler
    }

    /// Provision alarms and build the job table. Provisioning errors are
    /// fatal and reported to the error topic as a failed setup.
    #[instrument(skip(self))]
    pub async fn setup_at(&self, now: DateTime<Utc>) -> MonitorResult<Scheduler> {
        match self.provision().await {
            Ok(topic) => {
                info!("setup complete");
                Ok(self.scheduler(topic, now))
            }
            Err(e) => {
                self.notifier.notify(&format!("Setup failed: {e}")).await;
                Err(e)
            }
        }
    }
}
