//! JetStream subscriber with bounded concurrent dispatch

use crate::{
    client::NatsClient,
    message::CloudEvent,
    metrics,
    types::Disposition,
    Error, Result,
};
use async_nats::jetstream::{self, consumer};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Message handler trait
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one event and decide how the broker should settle it.
    ///
    /// `cancel` fires on shutdown; handlers should abort in-flight work and
    /// return [`Disposition::Nak`] so the event is redelivered.
    async fn handle(&self, event: CloudEvent, cancel: CancellationToken) -> Disposition;
}

/// Subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberConfig {
    /// Stream holding inbound events
    pub stream_name: String,

    /// Subjects captured by the stream
    pub stream_subjects: Vec<String>,

    /// Subject filter for the consumer
    pub filter_subject: String,

    /// Durable consumer name
    pub durable_name: String,

    /// Max messages processed concurrently
    pub max_concurrent: usize,

    /// Acknowledgment wait time in seconds
    pub ack_wait_secs: u64,

    /// Max delivery attempts
    pub max_deliver: i64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            stream_name: "PAYMENTS".to_string(),
            stream_subjects: vec!["payments.>".to_string()],
            filter_subject: "payments.created".to_string(),
            durable_name: "fraud-scoring".to_string(),
            max_concurrent: 16,
            ack_wait_secs: 30,
            max_deliver: 5,
        }
    }
}

/// Event subscriber
pub struct Subscriber {
    client: Arc<NatsClient>,
    config: SubscriberConfig,
}

impl Subscriber {
    /// Create new subscriber
    pub fn new(client: Arc<NatsClient>, config: SubscriberConfig) -> Self {
        Self { client, config }
    }

    /// Consume until `cancel` fires, then wait for in-flight messages
    pub async fn run<H>(&self, handler: Arc<H>, cancel: CancellationToken) -> Result<()>
    where
        H: MessageHandler + 'static,
    {
        let consumer = self.consumer().await?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))?;

        let max_concurrent = self.config.max_concurrent.max(1);
        let permits = Arc::new(Semaphore::new(max_concurrent));

        info!(
            stream = %self.config.stream_name,
            consumer = %self.config.durable_name,
            filter = %self.config.filter_subject,
            max_concurrent,
            "Subscriber started"
        );

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = messages.next() => next,
            };

            let msg = match next {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    warn!(error = %e, "Error receiving message");
                    continue;
                }
                None => {
                    warn!("Message stream closed");
                    break;
                }
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Not processed; leave it for redelivery
                    settle(&msg, Disposition::Nak).await;
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let handler = handler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                process(msg, handler.as_ref(), cancel).await;
                drop(permit);
            });
        }

        info!("Subscriber draining in-flight messages");
        // Every permit back means every spawned task finished
        let _ = permits.acquire_many(max_concurrent as u32).await;
        info!("Subscriber stopped");

        Ok(())
    }

    async fn consumer(&self) -> Result<consumer::PullConsumer> {
        let stream = self
            .client
            .get_or_create_stream(&self.config.stream_name, self.config.stream_subjects.clone())
            .await?;

        let consumer = match stream.get_consumer(&self.config.durable_name).await {
            Ok(consumer) => consumer,
            Err(_) => {
                info!("Creating durable consumer {}", self.config.durable_name);
                stream
                    .create_consumer(consumer::pull::Config {
                        durable_name: Some(self.config.durable_name.clone()),
                        filter_subject: self.config.filter_subject.clone(),
                        ack_policy: consumer::AckPolicy::Explicit,
                        ack_wait: Duration::from_secs(self.config.ack_wait_secs),
                        max_deliver: self.config.max_deliver,
                        deliver_policy: consumer::DeliverPolicy::All,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| Error::JetStream(e.to_string()))?
            }
        };

        Ok(consumer)
    }
}

/// Parse, dispatch and settle one message
async fn process<H>(msg: jetstream::Message, handler: &H, cancel: CancellationToken)
where
    H: MessageHandler + ?Sized,
{
    let start = Instant::now();
    let subject = msg.subject.to_string();

    let (disposition, status) = match CloudEvent::from_bytes(&msg.payload) {
        Ok(event) => {
            debug!(subject = %subject, event_id = %event.id, event_type = %event.event_type, "Event received");
            let disposition = handler.handle(event, cancel).await;
            (disposition, disposition.as_str())
        }
        Err(e) => {
            error!(subject = %subject, error = %e, "Failed to parse event");
            // Redelivery cannot fix a malformed envelope
            (Disposition::Term, "parse_error")
        }
    };

    settle(&msg, disposition).await;

    metrics::record_receive(&subject, status, start.elapsed());
}

async fn settle(msg: &jetstream::Message, disposition: Disposition) {
    let result = match disposition {
        Disposition::Ack => msg.ack().await,
        Disposition::Nak => msg.ack_with(jetstream::AckKind::Nak(None)).await,
        Disposition::Term => msg.ack_with(jetstream::AckKind::Term).await,
    };

    if let Err(e) = result {
        error!(disposition = disposition.as_str(), error = %e, "Failed to settle message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_config_default() {
        let config = SubscriberConfig::default();
        assert_eq!(config.durable_name, "fraud-scoring");
        assert_eq!(config.max_deliver, 5);
        assert_eq!(config.max_concurrent, 16);
        assert_eq!(config.ack_wait_secs, 30);
    }

    #[test]
    fn test_config_from_json() {
        let config: SubscriberConfig = serde_json::from_str(
            r#"{"stream_name":"CHECKOUT","stream_subjects":["checkout.>"],
                "filter_subject":"checkout.payments","durable_name":"scorer",
                "max_concurrent":4,"ack_wait_secs":10,"max_deliver":2}"#,
        )
        .unwrap();

        assert_eq!(config.stream_subjects, vec!["checkout.>"]);
        assert_eq!(config.max_concurrent, 4);
    }
}
