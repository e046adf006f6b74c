//! In-memory provider (no external calls)
//!
//! Answers from a table of scripted values. As a test double it records
//! every request; the dry-run instance behind the `none` provider
//! configuration keeps no history, so a long-running loop stays bounded.
//!
//! Unknown (instance, stat) pairs have no data points.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use super::{AlarmSpec, MetricsProvider, NotificationProvider, ProviderResult, TopicHandle};
use crate::error::ProviderError;

/// Provider operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAverage,
    PutAlarm,
    CreateTopic,
    Subscribe,
    Publish,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub topic: TopicHandle,
    pub protocol: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: TopicHandle,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AverageQuery {
    pub instance_id: String,
    pub stat: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: TimeDelta,
}

#[derive(Debug, Default)]
struct State {
    averages: HashMap<(String, String), f64>,
    failing_pairs: HashSet<(String, String)>,
    failing: HashSet<Operation>,
    queries: Vec<AverageQuery>,
    alarms: Vec<AlarmSpec>,
    topics: Vec<String>,
    subscriptions: Vec<Subscription>,
    published: Vec<PublishedMessage>,
}

#[derive(Debug)]
pub struct MemoryProvider {
    state: Mutex<State>,
    recording: bool,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    /// Recording provider
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            recording: true,
        }
    }

    /// Provider for dry runs, which logs requests but keeps no history of
    /// queries, subscriptions or published messages.
    pub fn dry_run() -> Self {
        Self {
            state: Mutex::new(State::default()),
            recording: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: Operation) -> ProviderResult<()> {
        if self.state().failing.contains(&operation) {
            return Err(ProviderError::Rejected(format!("{operation:?} is failing")));
        }
        Ok(())
    }

    /// Answer queries for `(instance_id, stat)` with `value`.
    pub fn set_average(&self, instance_id: &str, stat: &str, value: f64) {
        self.state()
            .averages
            .insert((instance_id.to_string(), stat.to_string()), value);
    }

    /// Make queries for `(instance_id, stat)` return an error.
    pub fn fail_query(&self, instance_id: &str, stat: &str) {
        self.state()
            .failing_pairs
            .insert((instance_id.to_string(), stat.to_string()));
    }

    /// Make every call of `operation` return an error.
    pub fn fail(&self, operation: Operation) {
        self.state().failing.insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.state().failing.remove(&operation);
    }

    pub fn queries(&self) -> Vec<AverageQuery> {
        self.state().queries.clone()
    }

    pub fn alarms(&self) -> Vec<AlarmSpec> {
        self.state().alarms.clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.state().topics.clone()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state().published.clone()
    }

    /// Messages published to `topic`
    pub fn published_to(&self, topic: &TopicHandle) -> Vec<PublishedMessage> {
        self.state()
            .published
            .iter()
            .filter(|message| &message.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MetricsProvider for MemoryProvider {
    async fn get_average(
        &self,
        instance_id: &str,
        stat: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: TimeDelta,
    ) -> ProviderResult<Option<f64>> {
        let key = (instance_id.to_string(), stat.to_string());
        let mut state = self.state();

        if self.recording {
            state.queries.push(AverageQuery {
                instance_id: instance_id.to_string(),
                stat: stat.to_string(),
                start,
                end,
                period,
            });
        }

        if state.failing.contains(&Operation::GetAverage) || state.failing_pairs.contains(&key) {
            return Err(ProviderError::Rejected(format!(
                "query for {stat} on {instance_id} failed"
            )));
        }

        let value = state.averages.get(&key).copied();
        debug!("in-memory provider: average for {stat} on {instance_id} is {value:?}");
        Ok(value)
    }

    async fn put_alarm(&self, alarm: &AlarmSpec) -> ProviderResult<()> {
        self.check(Operation::PutAlarm)?;

        let mut state = self.state();
        state.alarms.retain(|existing| existing.name != alarm.name);
        state.alarms.push(alarm.clone());

        debug!("in-memory provider: registered alarm {}", alarm.name);
        Ok(())
    }
}

#[async_trait]
impl NotificationProvider for MemoryProvider {
    async fn create_topic(&self, name: &str) -> ProviderResult<TopicHandle> {
        self.check(Operation::CreateTopic)?;

        let mut state = self.state();
        if !state.topics.iter().any(|topic| topic == name) {
            state.topics.push(name.to_string());
        }

        Ok(TopicHandle::new(format!("memory:{name}")))
    }

    async fn subscribe(
        &self,
        topic: &TopicHandle,
        protocol: &str,
        endpoint: &str,
    ) -> ProviderResult<()> {
        self.check(Operation::Subscribe)?;

        info!("in-memory provider: subscribed {protocol}:{endpoint} to {topic}");
        if self.recording {
            self.state().subscriptions.push(Subscription {
                topic: topic.clone(),
                protocol: protocol.to_string(),
                endpoint: endpoint.to_string(),
            });
        }
        Ok(())
    }

    async fn publish(
        &self,
        topic: &TopicHandle,
        subject: &str,
        message: &str,
    ) -> ProviderResult<()> {
        self.check(Operation::Publish)?;

        info!("in-memory provider: [{topic}] {subject}\n{message}");
        if self.recording {
            self.state().published.push(PublishedMessage {
                topic: topic.clone(),
                subject: subject.to_string(),
                message: message.to_string(),
            });
        }
        Ok(())
    }
}
