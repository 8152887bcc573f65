//! Message Bus with NATS support
//!
//! Provides pub/sub messaging with:
//! - CloudEvents envelopes in structured JSON mode
//! - JetStream durable pull consumers with explicit ack/nak/term
//! - Bounded concurrent dispatch and graceful shutdown
//! - Retry logic with exponential backoff
//! - Observability via Prometheus metrics

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod error;
pub mod message;
pub mod metrics;
pub mod publisher;
pub mod subscriber;
pub mod types;

pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
pub use message::CloudEvent;
pub use publisher::{EventPublisher, Publisher, PublisherConfig};
pub use subscriber::{MessageHandler, Subscriber, SubscriberConfig};
pub use types::Disposition;
