use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Deserializer};
use tracing::trace;

use crate::error::ConfigError;

/// Provider backend configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// In-memory provider (no external calls, everything is logged); only
    /// started when a dry run is asked for
    #[default]
    #[serde(rename = "none")]
    None,

    /// JSON gateway in front of the metrics and notification services
    Http {
        /// Base URL of the gateway
        endpoint: String,

        /// Bearer token (falls back to `INSTANCE_WATCH_TOKEN`)
        token: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_collect_interval")]
    pub collect_interval_secs: u64,

    #[serde(default = "default_summary_weekday")]
    pub summary_weekday: Weekday,

    /// Time of day (UTC) the digest is sent, `HH:MM` or `HH:MM:SS`
    #[serde(
        default = "default_summary_time",
        deserialize_with = "deserialize_time_of_day"
    )]
    pub summary_time: NaiveTime,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            collect_interval_secs: default_collect_interval(),
            summary_weekday: default_summary_weekday(),
            summary_time: default_summary_time(),
        }
    }
}

fn default_collect_interval() -> u64 {
    60
}

fn default_summary_weekday() -> Weekday {
    Weekday::Sun
}

fn default_summary_time() -> NaiveTime {
    NaiveTime::MIN
}

fn deserialize_time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(|e| serde::de::Error::custom(format!("invalid time of day `{raw}`: {e}")))
}

/// Warning and critical threshold of one stat
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    #[serde(alias = "amber")]
    pub warning: f64,
    #[serde(alias = "red")]
    pub critical: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub region: String,
    pub instances: Vec<String>,
    pub stats: Vec<String>,
    pub thresholds: HashMap<String, Thresholds>,

    /// Recipient subscribed to the alarm topic
    pub email: String,

    /// Process log destination
    pub log_file: PathBuf,

    /// Append-only metrics log
    #[serde(alias = "metrics")]
    pub metrics_file: PathBuf,

    #[serde(alias = "sns_topic_name")]
    pub topic_name: String,

    /// Handle of the pre-existing topic error notifications go to
    #[serde(alias = "error_topic_arn")]
    pub error_topic: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    pub fn thresholds_for(&self, stat: &str) -> Option<Thresholds> {
        self.thresholds.get(stat).copied()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::Invalid("no instances configured".into()));
        }

        if self.stats.is_empty() {
            return Err(ConfigError::Invalid("no stats configured".into()));
        }

        if let Some(stat) = self.stats.iter().find(|stat| !self.thresholds.contains_key(*stat)) {
            return Err(ConfigError::Invalid(format!(
                "no thresholds configured for stat `{stat}`"
            )));
        }

        if self.schedule.collect_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "collect_interval_secs must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Refuse a run that would talk to no provider unless it is a dry run.
    pub fn check_provider(&self, dry_run: bool) -> Result<(), ConfigError> {
        match self.provider {
            ProviderConfig::None if !dry_run => Err(ConfigError::Invalid(
                "no provider backend configured (set `provider.backend` or pass --dry-run)".into(),
            )),
            _ => Ok(()),
        }
    }
}

pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
