//! HTTP gateway provider
//!
//! Speaks JSON to a gateway exposing the metrics and notification services:
//!
//! ```text
//! POST {endpoint}/metrics/average   → {"value": number | null}
//! PUT  {endpoint}/alarms/{name}
//! POST {endpoint}/topics            → {"handle": string}
//! POST {endpoint}/subscriptions
//! POST {endpoint}/messages
//! ```
//!
//! The client is built without a request timeout; a hung call blocks the
//! caller until the transport gives up.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{instrument, trace};

use super::{
    AlarmSpec, MetricsProvider, NAMESPACE, NotificationProvider, ProviderResult, STATISTIC,
    TopicHandle,
};
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct AverageResponse {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TopicResponse {
    handle: String,
}

#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    endpoint: String,
    region: String,
    token: Option<String>,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>, token: Option<String>) -> Self {
        let endpoint: String = endpoint.into();

        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            region: region.into(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetricsProvider for HttpProvider {
    #[instrument(skip(self))]
    async fn get_average(
        &self,
        instance_id: &str,
        stat: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: TimeDelta,
    ) -> ProviderResult<Option<f64>> {
        let payload = json!({
            "region": self.region,
            "namespace": NAMESPACE,
            "instance_id": instance_id,
            "metric_name": stat,
            "statistic": STATISTIC,
            "start": start.to_rfc3339(),
            "end": end.to_rfc3339(),
            "period": period.num_seconds(),
        });

        let response = self
            .send(self.client.post(self.url("metrics/average")).json(&payload))
            .await?;
        let AverageResponse { value } = Self::decode(response).await?;

        trace!("average for {stat} on {instance_id}: {value:?}");
        Ok(value)
    }

    #[instrument(skip(self, alarm), fields(alarm = %alarm.name))]
    async fn put_alarm(&self, alarm: &AlarmSpec) -> ProviderResult<()> {
        let mut payload = serde_json::to_value(alarm).map_err(|e| ProviderError::Decode(e.to_string()))?;
        payload["region"] = json!(self.region);

        self.send(
            self.client
                .put(self.url(&format!("alarms/{}", alarm.name)))
                .json(&payload),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationProvider for HttpProvider {
    #[instrument(skip(self))]
    async fn create_topic(&self, name: &str) -> ProviderResult<TopicHandle> {
        let payload = json!({ "region": self.region, "name": name });

        let response = self
            .send(self.client.post(self.url("topics")).json(&payload))
            .await?;
        let TopicResponse { handle } = Self::decode(response).await?;

        Ok(TopicHandle::new(handle))
    }

    #[instrument(skip(self))]
    async fn subscribe(
        &self,
        topic: &TopicHandle,
        protocol: &str,
        endpoint: &str,
    ) -> ProviderResult<()> {
        let payload = json!({
            "region": self.region,
            "topic": topic,
            "protocol": protocol,
            "endpoint": endpoint,
        });

        self.send(self.client.post(self.url("subscriptions")).json(&payload))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn publish(
        &self,
        topic: &TopicHandle,
        subject: &str,
        message: &str,
    ) -> ProviderResult<()> {
        let payload = json!({
            "region": self.region,
            "topic": topic,
            "subject": subject,
            "message": message,
        });

        self.send(self.client.post(self.url("messages")).json(&payload))
            .await?;
        Ok(())
    }
}
