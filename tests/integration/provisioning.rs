//! Startup provisioning against the in-memory and HTTP providers

use std::sync::Arc;

use assert_matches::assert_matches;
use instance_watch::error::{ErrorKind, MonitorError};
use instance_watch::provider::http::HttpProvider;
use instance_watch::provider::memory::Operation;
use instance_watch::provider::{Comparison, Providers, TopicHandle};
use instance_watch::Monitor;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_provisioning_registers_named_alarms() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, providers) = memory_providers();
    let config = create_test_config(&dir.path().join("m.jsonl"), &["i-1"], &["CPUUtilization"]);

    let topic = Monitor::new(config, providers).provision().await.unwrap();

    let alarms = provider.alarms();
    let names: Vec<_> = alarms.iter().map(|alarm| alarm.name.clone()).collect();
    assert_eq!(
        names,
        vec![
            "i-1_CPUUtilization_Warning_Alarm".to_string(),
            "i-1_CPUUtilization_Critical_Alarm".to_string()
        ]
    );
    assert_eq!(alarms[0].threshold, 70.0);
    assert_eq!(alarms[1].threshold, 90.0);
    assert!(alarms.iter().all(|alarm| alarm.comparison == Comparison::GreaterThan));
    assert!(alarms.iter().all(|alarm| alarm.target_topic == topic));
}

#[tokio::test]
async fn test_provisioning_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, providers) = memory_providers();
    let config = create_test_config(
        &dir.path().join("m.jsonl"),
        &["i-1", "i-2"],
        &["CPUUtilization"],
    );
    let monitor = Monitor::new(config, providers);

    monitor.provision().await.unwrap();
    monitor.provision().await.unwrap();

    assert_eq!(provider.alarms().len(), 4);
}

#[tokio::test]
async fn test_subscription_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, providers) = memory_providers();
    provider.fail(Operation::Subscribe);
    let config = create_test_config(&dir.path().join("m.jsonl"), &["i-1"], &["CPUUtilization"]);

    let err = Monitor::new(config, providers).provision().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(provider.alarms().is_empty());
    let notified = provider.published_to(&TopicHandle::new("arn:errors"));
    assert_eq!(notified.len(), 1);
    assert!(notified[0].message.contains("subscribing email"));
}

#[tokio::test]
async fn test_provisioning_through_http_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"handle": "arn:alarms"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/alarms/i-1_CPUUtilization_(Warning|Critical)_Alarm$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HttpProvider::new(mock_server.uri(), "eu-west-1", None));
    let config = create_test_config(&dir.path().join("m.jsonl"), &["i-1"], &["CPUUtilization"]);

    let topic = Monitor::new(config, Providers::new(provider.clone(), provider))
        .provision()
        .await
        .unwrap();

    assert_eq!(topic, TopicHandle::new("arn:alarms"));
}

#[tokio::test]
async fn test_rejected_alarm_aborts_through_http_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"handle": "arn:alarms"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/alarms/"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad threshold"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HttpProvider::new(mock_server.uri(), "eu-west-1", None));
    let config = create_test_config(&dir.path().join("m.jsonl"), &["i-1"], &["CPUUtilization"]);

    let err = Monitor::new(config, Providers::new(provider.clone(), provider))
        .provision()
        .await
        .unwrap_err();

    assert_matches!(err, MonitorError::Fatal { .. });
}
