//! Collaborators consumed by the scoring service
//!
//! - [`HistoryGateway`]: buyer's last order and monthly average payment
//! - [`ResultSink`]: destination of finished scorecards
//!
//! Transport, timeouts and retries belong to the implementations; the
//! scoring service only sees success or a typed failure.

use crate::types::{AveragePayment, LastOrder, ScoreCard};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// History lookup failure
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No history recorded for the buyer
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote call failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote answered with data that cannot be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Scorecard delivery failure
#[derive(Debug, Error)]
pub enum SinkError {
    /// Scorecard could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delivery failed
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Source of a buyer's transaction history
#[async_trait]
pub trait HistoryGateway: Send + Sync {
    /// Buyer's most recent prior order
    async fn last_order(&self, buyer_document: &str) -> Result<LastOrder, GatewayError>;

    /// Buyer's average payment for the period containing `reference_time`
    async fn average_transactions(
        &self,
        buyer_document: &str,
        reference_time: DateTime<Utc>,
    ) -> Result<AveragePayment, GatewayError>;
}

/// Destination of finished scorecards
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist or publish a scorecard
    async fn store(&self, card: &ScoreCard) -> Result<(), SinkError>;
}
