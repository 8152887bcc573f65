//! Result Sink publishing scorecards as CloudEvents

use async_trait::async_trait;
use message_bus::{CloudEvent, EventPublisher};
use scoring_core::{ResultSink, ScoreCard, SinkError};
use std::sync::Arc;
use tracing::{error, info};

pub const SCORECARD_CREATED: &str = "funny-bunny.xyz.fraud-detection.v1.transaction.scorecard.created";
pub const EVENT_SOURCE: &str = "fraud-scoring";
pub const EVENT_SUBJECT: &str = "score-card-ready";

const AUDIENCE_EXTENSION: &str = "audience";
const AUDIENCE: &str = "external-bounded-context";
const CONTEXT_EXTENSION: &str = "eventcontext";
const CONTEXT: &str = "domain";

/// Wrap a scorecard in its outbound event
pub fn scorecard_event(card: &ScoreCard) -> Result<CloudEvent, SinkError> {
    let data = serde_json::to_value(card)?;

    Ok(CloudEvent::new(SCORECARD_CREATED, EVENT_SOURCE, data)
        .with_subject(EVENT_SUBJECT)
        .with_extension(AUDIENCE_EXTENSION, AUDIENCE)
        .with_extension(CONTEXT_EXTENSION, CONTEXT))
}

pub struct NatsScoreCardSink {
    publisher: Arc<dyn EventPublisher>,
    subject: String,
}

impl NatsScoreCardSink {
    pub fn new(publisher: Arc<dyn EventPublisher>, subject: impl Into<String>) -> Self {
        Self {
            publisher,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl ResultSink for NatsScoreCardSink {
    async fn store(&self, card: &ScoreCard) -> Result<(), SinkError> {
        let event = scorecard_event(card)?;

        if let Err(e) = self.publisher.publish_event(&self.subject, &event).await {
            error!(
                event_id = %event.id,
                payment_id = card.order().payment_id(),
                error = %e,
                "Failed to publish scorecard"
            );
            return Err(SinkError::Transport(e.to_string()));
        }

        info!(
            event_id = %event.id,
            payment_id = card.order().payment_id(),
            subject = %self.subject,
            "Scorecard published"
        );
        Ok(())
    }
}
