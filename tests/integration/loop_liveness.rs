//! The job loop survives failing ticks

use chrono::{DateTime, Utc};
use instance_watch::Monitor;
use instance_watch::monitor::{COLLECT_JOB, SUMMARY_JOB};
use instance_watch::provider::TopicHandle;
use instance_watch::storage::MetricsLog;
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn at(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

#[tokio::test]
async fn test_tick_after_log_write_failure_still_runs() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    let metrics_file = log_dir.join("m.jsonl");
    let (provider, providers) = memory_providers();
    provider.set_average("i-1", "CPUUtilization", 12.0);
    let monitor = Monitor::new(
        create_test_config(&metrics_file, &["i-1"], &["CPUUtilization"]),
        providers,
    );
    let mut scheduler = monitor.scheduler(TopicHandle::new("arn:alarms"), at("2024-01-03T10:00:00Z"));

    // the log directory does not exist yet: the tick fails and is notified
    assert_eq!(scheduler.run_pending(at("2024-01-03T10:01:00Z")).await, 1);
    let errors = provider.published_to(&TopicHandle::new("arn:errors"));
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("error writing metrics data to file"));

    std::fs::create_dir_all(&log_dir).unwrap();

    assert_eq!(scheduler.run_pending(at("2024-01-03T10:02:00Z")).await, 1);
    let records = MetricsLog::new(&metrics_file).read_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        scheduler.job(COLLECT_JOB).unwrap().last_run(),
        Some(at("2024-01-03T10:02:00Z"))
    );
}

#[tokio::test]
async fn test_week_of_scheduling() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, providers) = memory_providers();
    provider.set_average("i-1", "CPUUtilization", 50.0);
    let monitor = Monitor::new(
        create_test_config(&dir.path().join("m.jsonl"), &["i-1"], &["CPUUtilization"]),
        providers,
    );
    let topic = TopicHandle::new("arn:alarms");
    // Saturday 23:57
    let mut scheduler = monitor.scheduler(topic.clone(), at("2024-01-06T23:57:00Z"));

    assert_eq!(scheduler.run_pending(at("2024-01-06T23:58:00Z")).await, 1);
    assert_eq!(scheduler.run_pending(at("2024-01-06T23:59:00Z")).await, 1);
    // collection and summary both due at Sunday midnight
    assert_eq!(scheduler.run_pending(at("2024-01-07T00:00:00Z")).await, 2);

    assert_eq!(
        scheduler.job(SUMMARY_JOB).unwrap().next_run(),
        at("2024-01-14T00:00:00Z")
    );
    let digests = provider.published_to(&topic);
    assert_eq!(digests.len(), 1);
    assert!(digests[0].message.contains("Average: 50.0"));
}
