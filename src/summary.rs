//! Weekly digest of the metrics log
//!
//! The digest is recomputed from the full log every time it is sent and only
//! considers the first instance entry of each record.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::error::{MonitorError, MonitorResult};
use crate::notifier::Notifier;
use crate::provider::{NotificationProvider, TopicHandle};
use crate::scheduler::Task;
use crate::storage::{MetricRecord, MetricsLog};

pub const SUMMARY_SUBJECT: &str = "Weekly EC2 Metrics Summary";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatSummary {
    pub high: f64,
    pub low: f64,
    pub average: f64,
}

impl StatSummary {
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let average = values.iter().sum::<f64>() / values.len() as f64;

        Some(Self { high, low, average })
    }
}

/// Per-stat summaries in configured stat order; stats without any value are
/// left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryDigest {
    pub stats: Vec<(String, StatSummary)>,
}

impl SummaryDigest {
    pub fn compute(stats: &[String], records: &[MetricRecord]) -> Self {
        let stats = stats
            .iter()
            .filter_map(|stat| {
                let values = records
                    .iter()
                    .filter_map(MetricRecord::first_instance)
                    .filter_map(|entry| entry.value(stat))
                    .collect::<Vec<_>>();

                StatSummary::from_values(&values).map(|summary| (stat.clone(), summary))
            })
            .collect();

        Self { stats }
    }

    pub fn get(&self, stat: &str) -> Option<&StatSummary> {
        self.stats
            .iter()
            .find(|(name, _)| name == stat)
            .map(|(_, summary)| summary)
    }

    pub fn message(&self) -> String {
        let mut message = String::from("Weekly Summary:\n");

        for (stat, summary) in &self.stats {
            message.push_str(&format!(
                "\n{stat}:\n  High: {:?}\n  Low: {:?}\n  Average: {:?}",
                summary.high, summary.low, summary.average
            ));
        }

        message
    }
}

pub struct SummaryReporter {
    config: Arc<Config>,
    provider: Arc<dyn NotificationProvider>,
    log: MetricsLog,
    notifier: Notifier,
}

impl SummaryReporter {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn NotificationProvider>,
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

    async fn fail(&self, err: MonitorError) -> MonitorError {
        error!("{err}");
        self.notifier.notify(&err.to_string()).await;
        err
    }

    /// Compute the digest over the full log and publish it to `topic`.
    #[instrument(skip(self))]
    pub async fn report(&self, topic: &TopicHandle) -> MonitorResult<SummaryDigest> {
        let records = match self.log.read_all().await {
            Ok(records) => records,
            Err(e) => {
                return Err(self
                    .fail(MonitorError::tick("error reading metrics data", e))
                    .await);
            }
        };

        let digest = SummaryDigest::compute(&self.config.stats, &records);
        let message = digest.message();

        if let Err(e) = self.provider.publish(topic, SUMMARY_SUBJECT, &message).await {
            return Err(self
                .fail(MonitorError::tick("error sending weekly summary", e))
                .await);
        }

        debug!("weekly summary sent: {message}");
        info!("weekly summary covered {} records", records.len());
        Ok(digest)
    }
}

/// Scheduled form of [`SummaryReporter::report`] bound to the alarm topic
pub struct WeeklySummary {
    reporter: SummaryReporter,
    topic: TopicHandle,
}

impl WeeklySummary {
    pub fn new(reporter: SummaryReporter, topic: TopicHandle) -> Self {
        Self { reporter, topic }
    }
}

#[async_trait]
impl Task for WeeklySummary {
    async fn run(&self) -> MonitorResult<()> {
        self.reporter.report(&self.topic).await.map(|_| ())
    }
}
