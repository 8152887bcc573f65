//! Fraud scoring service
//!
//! Consumes payment-created checkout events from NATS, enriches each
//! payment with the buyer's history over gRPC, scores it and publishes
//! the scorecard back to NATS.

pub mod checkout_receiver;
pub mod config;
pub mod error;
pub mod handlers;
pub mod history_client;
pub mod metrics;
pub mod proto;
pub mod scorecard_publisher;

pub use checkout_receiver::CheckoutReceiver;
pub use config::Config;
pub use error::{Result, ServiceError};
pub use history_client::GrpcHistoryGateway;
pub use scorecard_publisher::NatsScoreCardSink;
