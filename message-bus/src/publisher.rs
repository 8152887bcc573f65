//! Event publisher with retry logic

use crate::{
    client::NatsClient,
    message::CloudEvent,
    metrics,
    Error, Result,
};
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// JetStream deduplication header
pub const MSG_ID_HEADER: &str = "Nats-Msg-Id";

/// Content type of structured-mode CloudEvents
pub const CLOUDEVENTS_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Anything that can deliver a CloudEvent to a subject
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one event; returns once the broker accepted it
    async fn publish_event(&self, subject: &str, event: &CloudEvent) -> Result<()>;
}

/// Publisher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Enable JetStream persistence
    pub use_jetstream: bool,

    /// Publish timeout
    #[serde(with = "duration_millis")]
    pub publish_timeout: Duration,

    /// Max attempts, first one included
    pub max_retry_attempts: u32,

    /// Initial retry delay
    #[serde(with = "duration_millis")]
    pub initial_retry_delay: Duration,

    /// Max retry delay
    #[serde(with = "duration_millis")]
    pub max_retry_delay: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            use_jetstream: true,
            publish_timeout: Duration::from_secs(5),
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(2),
        }
    }
}

impl PublisherConfig {
    /// Delay before the given retry (1-based), doubling up to the maximum
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Event publisher
pub struct Publisher {
    client: Arc<NatsClient>,
    config: PublisherConfig,
}

impl Publisher {
    /// Create new publisher
    pub fn new(client: Arc<NatsClient>, config: PublisherConfig) -> Self {
        Self { client, config }
    }

    /// Active configuration
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publish with exponential backoff retry
    async fn publish_with_retry(&self, subject: &str, headers: HeaderMap, payload: Bytes) -> Result<()> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.publish_once(subject, headers.clone(), payload.clone()).await {
                Ok(()) => {
                    if attempts > 1 {
                        info!(subject, attempts, "Event published after retry");
                    }
                    return Ok(());
                }
                Err(e) => {
                    if !e.is_transient() || attempts >= self.config.max_retry_attempts {
                        error!(subject, attempts, error = %e, "Failed to publish event");
                        return Err(e);
                    }

                    let delay = self.config.retry_delay(attempts);
                    warn!(subject, attempts, ?delay, error = %e, "Publish failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Single publish attempt
    async fn publish_once(&self, subject: &str, headers: HeaderMap, payload: Bytes) -> Result<()> {
        let timeout = self.config.publish_timeout;

        let attempt = async {
            if self.config.use_jetstream {
                let ack = self
                    .client
                    .jetstream()
                    .publish_with_headers(subject.to_string(), headers, payload)
                    .await
                    .map_err(|e| publish_error(subject, e))?;

                // Wait for the stream to persist it
                ack.await
                    .map_err(|e| Error::JetStream(format!("Publish ack failed: {}", e)))?;
            } else {
                let client = self.client.client();
                client
                    .publish_with_headers(subject.to_string(), headers, payload)
                    .await
                    .map_err(|e| publish_error(subject, e))?;

                client
                    .flush()
                    .await
                    .map_err(|e| publish_error(subject, format!("flush failed: {}", e)))?;
            }
            Ok(())
        };

        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| Error::Timeout(timeout.as_millis() as u64))?
    }
}

fn publish_error(subject: &str, reason: impl ToString) -> Error {
    Error::Publish {
        subject: subject.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl EventPublisher for Publisher {
    async fn publish_event(&self, subject: &str, event: &CloudEvent) -> Result<()> {
        let start = Instant::now();

        debug!(subject, event_id = %event.id, event_type = %event.event_type, "Publishing event");

        let payload = Bytes::from(event.to_bytes()?);
        let mut headers = HeaderMap::new();
        headers.insert(MSG_ID_HEADER, event.id.as_str());
        headers.insert("Content-Type", CLOUDEVENTS_CONTENT_TYPE);

        let result = self.publish_with_retry(subject, headers, payload).await;

        metrics::record_publish(subject, result.is_ok(), start.elapsed());

        result
    }
}
