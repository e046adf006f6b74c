//! Collection ticks against the in-memory provider

use instance_watch::Monitor;
use instance_watch::storage::MetricsLog;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_tick_produces_complete_record() {
    let dir = tempfile::tempdir().unwrap();
    let metrics_file = dir.path().join("m.jsonl");
    let (provider, providers) = memory_providers();
    provider.set_average("i-1", "CPUUtilization", 42.0);
    let config = create_test_config(
        &metrics_file,
        &["i-1", "i-2", "i-3"],
        &["CPUUtilization", "NetworkIn", "DiskReadOps"],
    );

    let record = Monitor::new(config, providers)
        .collector()
        .collect()
        .await
        .unwrap();

    assert_eq!(record.metrics.len(), 3);
    for entry in &record.metrics {
        assert_eq!(entry.stats.len(), 3);
    }
    assert_eq!(record.instance("i-1").unwrap().value("CPUUtilization"), Some(42.0));
    assert_eq!(record.instance("i-3").unwrap().stats.get("DiskReadOps"), Some(&None));
    // every absent value raised one notification
    assert_eq!(provider.published().len(), 8);
}

#[tokio::test]
async fn test_n_ticks_yield_n_parseable_lines() {
    let dir = tempfile::tempdir().unwrap();
    let metrics_file = dir.path().join("m.jsonl");
    let (provider, providers) = memory_providers();
    provider.set_average("i-1", "CPUUtilization", 5.0);
    let collector = Monitor::new(
        create_test_config(&metrics_file, &["i-1"], &["CPUUtilization"]),
        providers,
    )
    .collector();

    for _ in 0..4 {
        collector.collect().await.unwrap();
    }

    let content = std::fs::read_to_string(&metrics_file).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    for line in &lines {
        serde_json::from_str::<instance_watch::storage::MetricRecord>(line).unwrap();
    }

    let records = MetricsLog::new(&metrics_file).read_all().await.unwrap();
    assert!(records.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[tokio::test]
async fn test_failing_instance_does_not_drop_others() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, providers) = memory_providers();
    provider.fail_query("i-1", "CPUUtilization");
    provider.set_average("i-2", "CPUUtilization", 33.0);
    let collector = Monitor::new(
        create_test_config(&dir.path().join("m.jsonl"), &["i-1", "i-2"], &["CPUUtilization"]),
        providers,
    )
    .collector();

    let record = collector.collect().await.unwrap();

    assert_eq!(record.metrics.len(), 2);
    assert_eq!(record.instance("i-1").unwrap().stats.get("CPUUtilization"), Some(&None));
    assert_eq!(record.instance("i-2").unwrap().value("CPUUtilization"), Some(33.0));
}
