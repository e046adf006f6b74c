//! External collaborators
//!
//! The monitor talks to two managed services: a metrics/alarm service and a
//! notification service. Both are reached only through the traits below.
//!
//! ## Backends
//!
//! - **HTTP** ([`http::HttpProvider`]): JSON gateway in front of both services
//! - **In-memory** ([`memory::MemoryProvider`]): no external calls; used for
//!   dry runs (`--dry-run`) and as the recording test double

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, ProviderConfig};
use crate::error::ProviderError;
use crate::util::get_token;

pub mod http;
pub mod memory;

/// Metric namespace every query and alarm lives in
pub const NAMESPACE: &str = "AWS/EC2";

/// Statistic requested from the provider
pub const STATISTIC: &str = "Average";

/// Granularity of queries and alarm evaluation, in seconds
pub const PERIOD_SECS: i64 = 60;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Opaque handle of a notification topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicHandle(String);

impl TopicHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "GreaterThanThreshold")]
    GreaterThan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Threshold alarm registered with the metrics provider
///
/// The provider owns the alarm lifecycle; registering a spec whose name
/// already exists replaces the old alarm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSpec {
    pub name: String,
    pub severity: Severity,
    pub namespace: String,
    pub metric_name: String,
    pub statistic: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub period_secs: i64,
    pub evaluation_periods: u32,
    pub instance_id: String,
    pub target_topic: TopicHandle,
}

impl AlarmSpec {
    pub fn alarm_name(instance_id: &str, stat: &str, severity: Severity) -> String {
        format!("{instance_id}_{stat}_{severity}_Alarm")
    }

    pub fn new(
        instance_id: &str,
        stat: &str,
        severity: Severity,
        threshold: f64,
        target_topic: TopicHandle,
    ) -> Self {
        Self {
            name: Self::alarm_name(instance_id, stat, severity),
            severity,
            namespace: NAMESPACE.to_string(),
            metric_name: stat.to_string(),
            statistic: STATISTIC.to_string(),
            threshold,
            comparison: Comparison::GreaterThan,
            period_secs: PERIOD_SECS,
            evaluation_periods: 1,
            instance_id: instance_id.to_string(),
            target_topic,
        }
    }
}

#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Average of `stat` on `instance_id` over `[start, end]` at `period`
    /// granularity. `Ok(None)` means the provider had no data point.
    async fn get_average(
        &self,
        instance_id: &str,
        stat: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: TimeDelta,
    ) -> ProviderResult<Option<f64>>;

    /// Create or replace an alarm.
    async fn put_alarm(&self, alarm: &AlarmSpec) -> ProviderResult<()>;
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Create (or reuse) a topic by name.
    async fn create_topic(&self, name: &str) -> ProviderResult<TopicHandle>;

    async fn subscribe(
        &self,
        topic: &TopicHandle,
        protocol: &str,
        endpoint: &str,
    ) -> ProviderResult<()>;

    async fn publish(&self, topic: &TopicHandle, subject: &str, message: &str)
    -> ProviderResult<()>;
}

/// Both provider handles, built once at startup
#[derive(Clone)]
pub struct Providers {
    pub metrics: Arc<dyn MetricsProvider>,
    pub notifications: Arc<dyn NotificationProvider>,
}

impl Providers {
    pub fn new(
        metrics: Arc<dyn MetricsProvider>,
        notifications: Arc<dyn NotificationProvider>,
    ) -> Self {
        Self {
            metrics,
            notifications,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match &config.provider {
            ProviderConfig::None => {
                let provider = Arc::new(memory::MemoryProvider::dry_run());
                Self::new(provider.clone(), provider)
            }
            ProviderConfig::Http { endpoint, token } => {
                let token = token.clone().or_else(get_token);
                let provider = Arc::new(http::HttpProvider::new(
                    endpoint.clone(),
                    config.region.clone(),
                    token,
                ));
                Self::new(provider.clone(), provider)
            }
        }
    }
}
