//! Inbound event bytes through to the published scorecard event, with the
//! broker and the history service replaced by in-memory doubles.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fraud_scoring::checkout_receiver::PAYMENT_CREATED;
use fraud_scoring::scorecard_publisher::SCORECARD_CREATED;
use fraud_scoring::{CheckoutReceiver, NatsScoreCardSink};
use message_bus::{CloudEvent, Disposition, EventPublisher, MessageHandler};
use rust_decimal_macros::dec;
use scoring_core::{
    AveragePayment, GatewayError, HistoryGateway, LastOrder, ScoringService, TransactionValidator,
    ValidationConfig,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const OUT_SUBJECT: &str = "fraud-detection.scorecards";

struct History;

#[async_trait]
impl HistoryGateway for History {
    async fn last_order(&self, _document: &str) -> Result<LastOrder, GatewayError> {
        Ok(LastOrder {
            seller_id: "seller-123".to_string(),
            currency: "EUR".to_string(),
            amount: dec!(250.00),
        })
    }

    async fn average_transactions(
        &self,
        _document: &str,
        _reference_time: DateTime<Utc>,
    ) -> Result<AveragePayment, GatewayError> {
        Ok(AveragePayment {
            month: "2024-03".to_string(),
            amount: dec!(80),
        })
    }
}

#[derive(Default)]
struct Outbox {
    events: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl EventPublisher for Outbox {
    async fn publish_event(&self, subject: &str, event: &CloudEvent) -> message_bus::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((subject.to_string(), event.to_bytes()?));
        Ok(())
    }
}

fn pipeline(outbox: Arc<Outbox>) -> CheckoutReceiver {
    let validator = TransactionValidator::new(ValidationConfig::default()).unwrap();
    let sink = Arc::new(NatsScoreCardSink::new(outbox, OUT_SUBJECT));
    let service = ScoringService::new(Arc::new(History), sink, validator);
    CheckoutReceiver::new(Arc::new(service))
}

fn inbound_bytes() -> Vec<u8> {
    let at = (Utc::now() - Duration::minutes(1))
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();

    json!({
        "specversion": "1.0",
        "id": "evt-001",
        "source": "payment-processing",
        "type": PAYMENT_CREATED,
        "datacontenttype": "application/json",
        "data": {
            "checkout": {
                "id": "order-456",
                "buyerInfo": {"document": "12345678901", "name": "John Doe"},
                "cardInfo": {"cardInfo": "****1234", "token": "tok_123"},
                "idempotencyKey": "idem-checkout",
                "at": at
            },
            "payment": {
                "id": "payment-789",
                "amount": "250.00",
                "currency": "USD",
                "status": "completed",
                "sellerInfo": {"sellerId": "seller-999"},
                "idempotencyKey": "idem-payment"
            }
        }
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn payment_created_event_produces_scorecard_event() {
    let outbox = Arc::new(Outbox::default());
    let receiver = pipeline(outbox.clone());

    let inbound = CloudEvent::from_bytes(&inbound_bytes()).unwrap();
    let disposition = receiver.handle(inbound, CancellationToken::new()).await;
    assert_eq!(disposition, Disposition::Ack);

    let events = outbox.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, OUT_SUBJECT);

    let outbound = CloudEvent::from_bytes(&events[0].1).unwrap();
    assert_eq!(outbound.event_type, SCORECARD_CREATED);
    assert_eq!(outbound.source, "fraud-scoring");
    assert_eq!(outbound.subject.as_deref(), Some("score-card-ready"));
    assert_eq!(outbound.extension("audience"), Some("external-bounded-context"));
    assert_eq!(outbound.extension("eventcontext"), Some("domain"));

    // same amount, other currency, other seller, above the month average
    let data = outbound.data.unwrap();
    assert_eq!(data["score"]["valueScore"]["score"], -3);
    assert_eq!(data["score"]["currencyScore"]["score"], -1);
    assert_eq!(data["score"]["sellerScore"]["score"], 0);
    assert_eq!(data["score"]["averageValueScore"]["score"], -3);
    assert_eq!(data["transaction"]["paymentId"], "payment-789");
    assert_eq!(data["transaction"]["buyerDocument"], "12345678901");
}

#[tokio::test]
async fn stale_checkout_is_terminated_without_publishing() {
    let outbox = Arc::new(Outbox::default());
    let receiver = pipeline(outbox.clone());

    let mut inbound = CloudEvent::from_bytes(&inbound_bytes()).unwrap();
    if let Some(data) = inbound.data.as_mut() {
        data["checkout"]["at"] = json!("2020-01-01T00:00:00.000000");
    }

    let disposition = receiver.handle(inbound, CancellationToken::new()).await;
    assert_eq!(disposition, Disposition::Term);
    assert!(outbox.events.lock().unwrap().is_empty());
}
