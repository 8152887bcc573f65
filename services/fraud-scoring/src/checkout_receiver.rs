//! Inbound adapter for checkout events
//!
//! Filters payment-created CloudEvents, fans the checkout out into one
//! transaction per payment, assesses each and folds the outcomes into a
//! single broker disposition.

use crate::metrics::{self, EVENTS_IGNORED_TOTAL, IGNORED_OTHER, OUTCOME_MALFORMED};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::future::join_all;
use message_bus::{CloudEvent, Disposition, MessageHandler};
use scoring_core::{
    BuyerInfo, CardInfo, Checkout, ErrorKind, Participants, Payment, ScoringService, SellerInfo,
    Transaction,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const PAYMENT_CREATED: &str = "paymentic.io.payment-processing.v1.payment.created";

/// Checkout timestamp format (microseconds, no offset, UTC)
const CHECKOUT_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Invalid event data: {0}")]
    Data(#[from] message_bus::Error),

    #[error("Invalid checkout timestamp '{0}'")]
    Timestamp(String),

    #[error("Checkout has no payments")]
    NoPayments,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutData {
    checkout: CheckoutPayload,
    #[serde(default)]
    payment: Option<PaymentPayload>,
    #[serde(default)]
    payments: Vec<PaymentPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    buyer_info: BuyerPayload,
    #[serde(default)]
    card_info: CardPayload,
    #[serde(default)]
    at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuyerPayload {
    #[serde(default)]
    document: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardPayload {
    #[serde(default)]
    card_info: String,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentPayload {
    #[serde(default)]
    id: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    seller_info: SellerPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SellerPayload {
    #[serde(default)]
    seller_id: String,
}

/// Parse a checkout timestamp; RFC 3339 is accepted as well
pub fn parse_checkout_time(raw: &str) -> Result<DateTime<Utc>, EnvelopeError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, CHECKOUT_AT_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| EnvelopeError::Timestamp(raw.to_string()))
}

/// One transaction per payment carried by a payment-created event
pub fn transactions_from_event(event: &CloudEvent) -> Result<Vec<Transaction>, EnvelopeError> {
    let data: CheckoutData = event.data_as()?;
    let occurred_at = parse_checkout_time(&data.checkout.at)?;

    let payments: Vec<PaymentPayload> = data.payment.into_iter().chain(data.payments).collect();
    if payments.is_empty() {
        return Err(EnvelopeError::NoPayments);
    }

    let checkout = data.checkout;
    let transactions = payments
        .into_iter()
        .map(|payment| Transaction {
            participants: Participants {
                buyer: BuyerInfo {
                    document: checkout.buyer_info.document.clone(),
                    name: checkout.buyer_info.name.clone(),
                },
                seller: SellerInfo {
                    seller_id: payment.seller_info.seller_id,
                },
            },
            checkout: Checkout {
                id: checkout.id.clone(),
                card: CardInfo {
                    card_info: checkout.card_info.card_info.clone(),
                    token: checkout.card_info.token.clone(),
                },
                occurred_at: Some(occurred_at),
            },
            payment: Payment {
                id: payment.id,
                amount: payment.amount,
                currency: payment.currency,
                status: payment.status,
            },
        })
        .collect();

    Ok(transactions)
}

/// Broker disposition for a failed assessment
pub fn disposition_for(kind: ErrorKind) -> Disposition {
    match kind {
        // Redelivery cannot fix the payload
        ErrorKind::ValidationFailure | ErrorKind::InvalidOrder => Disposition::Term,
        ErrorKind::LastOrderNotFound
        | ErrorKind::AverageNotFound
        | ErrorKind::PublishFailure
        | ErrorKind::Cancelled
        | ErrorKind::InvalidConfig => Disposition::Nak,
    }
}

pub struct CheckoutReceiver {
    service: Arc<ScoringService>,
}

impl CheckoutReceiver {
    pub fn new(service: Arc<ScoringService>) -> Self {
        Self { service }
    }

    async fn assess(&self, tx: &Transaction, cancel: &CancellationToken) -> Disposition {
        let start = Instant::now();
        let result = self.service.assess_transaction(tx, cancel).await;
        metrics::observe_assessment(&result, start.elapsed());

        match result {
            Ok(card) => {
                debug!(payment_id = %tx.payment.id, total = card.total(), "Transaction scored");
                Disposition::Ack
            }
            Err(e) => {
                let disposition = disposition_for(e.kind());
                error!(
                    payment_id = %tx.payment.id,
                    buyer_document = %tx.participants.buyer.document,
                    seller_id = %tx.participants.seller.seller_id,
                    error_kind = e.kind().as_str(),
                    stage = ?e.stage(),
                    disposition = disposition.as_str(),
                    error = %e,
                    "Error to make scorecard for transaction"
                );
                disposition
            }
        }
    }
}

#[async_trait]
impl MessageHandler for CheckoutReceiver {
    async fn handle(&self, event: CloudEvent, cancel: CancellationToken) -> Disposition {
        if event.event_type != PAYMENT_CREATED {
            debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring event");
            EVENTS_IGNORED_TOTAL.with_label_values(&[IGNORED_OTHER]).inc();
            return Disposition::Ack;
        }

        let transactions = match transactions_from_event(&event) {
            Ok(transactions) => transactions,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Malformed checkout event");
                metrics::ASSESSMENTS_TOTAL
                    .with_label_values(&[OUTCOME_MALFORMED])
                    .inc();
                return Disposition::Term;
            }
        };

        info!(
            event_id = %event.id,
            payments = transactions.len(),
            "Checkout event received"
        );

        join_all(transactions.iter().map(|tx| self.assess(tx, &cancel)))
            .await
            .into_iter()
            .collect()
    }
}
