//! Shared fixtures for unit tests

use std::collections::HashMap;

use crate::config::{Config, ProviderConfig, ScheduleConfig, Thresholds};

/// Config with warning 70 / critical 90 for every stat.
pub fn test_config(instances: &[&str], stats: &[&str]) -> Config {
    Config {
        region: "eu-west-1".to_string(),
        instances: instances.iter().map(|i| i.to_string()).collect(),
        stats: stats.iter().map(|s| s.to_string()).collect(),
        thresholds: stats
            .iter()
            .map(|stat| {
                (
                    stat.to_string(),
                    Thresholds {
                        warning: 70.0,
                        critical: 90.0,
                    },
                )
            })
            .collect::<HashMap<_, _>>(),
        email: "ops@example.com".to_string(),
        log_file: "monitor.log".into(),
        metrics_file: "metrics.jsonl".into(),
        topic_name: "instance-alarms".to_string(),
        error_topic: "arn:errors".to_string(),
        provider: ProviderConfig::None,
        schedule: ScheduleConfig::default(),
    }
}
