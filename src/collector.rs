//! MetricsCollector - one tick of metric collection
//!
//! ## Message Flow
//!
//! ```text
//! Scheduler tick → query every (instance, stat) → build MetricRecord → append to log
//!                        │
//!                        └─ empty / failed query → absent value + error notification
//! ```
//!
//! A single failing query never aborts the tick. A failing log append does:
//! the tick reports a `TickFailure` so the operator is alerted immediately.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::error::{MonitorError, MonitorResult};
use crate::notifier::Notifier;
use crate::provider::{MetricsProvider, PERIOD_SECS};
use crate::scheduler::Task;
use crate::storage::{InstanceMetrics, MetricRecord, MetricsLog};

/// Length of the window every query averages over
pub const WINDOW_MINUTES: i64 = 5;

pub struct MetricsCollector {
    config: Arc<Config>,
    provider: Arc<dyn MetricsProvider>,
    log: MetricsLog,
    notifier: Notifier,
}

impl MetricsCollector {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn MetricsProvider>,
        log: MetricsLog,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            provider,
            log,
            notifier,
        }
    }

    pub async fn collect(&self) -> MonitorResult<MetricRecord> {
        self.collect_at(Utc::now()).await
    }

    /// Collect the window ending at `now` and append it to the log.
    #[instrument(skip(self))]
    pub async fn collect_at(&self, now: DateTime<Utc>) -> MonitorResult<MetricRecord> {
        let start = now - TimeDelta::minutes(WINDOW_MINUTES);
        let mut record = MetricRecord::new(now);

        for instance_id in &self.config.instances {
            let mut entry = InstanceMetrics::new(instance_id.as_str());

            for stat in &self.config.stats {
                let value = match self.query(instance_id, stat, start, now).await {
                    Ok(value) => Some(value),
                    Err(e) => {
                        error!("{e}");
                        self.notifier.notify(&e.to_string()).await;
                        None
                    }
                };
                entry.stats.insert(stat.clone(), value);
            }

            record.metrics.push(entry);
        }

        debug!("metrics data recorded: {record:?}");

        if let Err(e) = self.log.append(&record).await {
            let err = MonitorError::tick("error writing metrics data to file", e);
            error!("{err}");
            self.notifier.notify(&err.to_string()).await;
            return Err(err);
        }

        Ok(record)
    }

    async fn query(
        &self,
        instance_id: &str,
        stat: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> MonitorResult<f64> {
        match self
            .provider
            .get_average(instance_id, stat, start, end, TimeDelta::seconds(PERIOD_SECS))
            .await
        {
            Ok(Some(value)) => {
                debug!("{stat} on {instance_id}: {value}");
                Ok(value)
            }
            Ok(None) => Err(MonitorError::item(
                instance_id,
                stat,
                "no data points available",
            )),
            Err(e) => Err(MonitorError::item(instance_id, stat, e)),
        }
    }
}

#[async_trait]
impl Task for MetricsCollector {
    async fn run(&self) -> MonitorResult<()> {
        self.collect().await.map(|_| ())
    }
}
