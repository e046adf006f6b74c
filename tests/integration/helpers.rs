//! Helper functions for integration tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use instance_watch::config::{Config, ProviderConfig, ScheduleConfig, Thresholds};
use instance_watch::provider::Providers;
use instance_watch::provider::memory::MemoryProvider;

pub fn create_test_config(metrics_file: &Path, instances: &[&str], stats: &[&str]) -> Config {
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
        log_file: metrics_file.with_extension("log"),
        metrics_file: metrics_file.to_path_buf(),
        topic_name: "instance-alarms".to_string(),
        error_topic: "arn:errors".to_string(),
        provider: ProviderConfig::None,
        schedule: ScheduleConfig::default(),
    }
}

pub fn memory_providers() -> (Arc<MemoryProvider>, Providers) {
    let provider = Arc::new(MemoryProvider::new());
    let providers = Providers::new(provider.clone(), provider.clone());
    (provider, providers)
}
