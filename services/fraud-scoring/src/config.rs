use config::{ConfigError, Environment};
use message_bus::{NatsConfig, PublisherConfig, SubscriberConfig};
use scoring_core::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub nats: NatsSettings,
    pub history: HistoryConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NatsSettings {
    pub url: String,
    pub connection_name: String,
    pub connect_timeout_secs: u64,

    // Inbound checkout events
    pub inbound_stream: String,
    pub inbound_subjects: Vec<String>,
    pub inbound_subject: String,
    pub durable_name: String,
    pub ack_wait_secs: u64,
    pub max_deliver: i64,
    pub max_concurrent: usize,

    // Outbound scorecards
    pub outbound_stream: String,
    pub outbound_subject: String,
    pub use_jetstream: bool,
    pub publish_timeout_ms: u64,
    pub max_retry_attempts: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl NatsSettings {
    pub fn client_config(&self) -> NatsConfig {
        NatsConfig {
            url: self.url.clone(),
            name: self.connection_name.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }

    pub fn subscriber_config(&self) -> SubscriberConfig {
        SubscriberConfig {
            stream_name: self.inbound_stream.clone(),
            stream_subjects: self.inbound_subjects.clone(),
            filter_subject: self.inbound_subject.clone(),
            durable_name: self.durable_name.clone(),
            max_concurrent: self.max_concurrent,
            ack_wait_secs: self.ack_wait_secs,
            max_deliver: self.max_deliver,
        }
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            use_jetstream: self.use_jetstream,
            publish_timeout: Duration::from_millis(self.publish_timeout_ms),
            max_retry_attempts: self.max_retry_attempts,
            initial_retry_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }
}

/// User transactions (history) gRPC service
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    /// `host:port` or full URI
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl HistoryConfig {
    /// Endpoint as an `http://` URI
    pub fn endpoint_uri(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ValidationConfig::default();

        let mut builder = config::Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", 2)?
            // NATS defaults
            .set_default("nats.url", "nats://localhost:4222")?
            .set_default("nats.connection_name", "fraud-scoring")?
            .set_default("nats.connect_timeout_secs", 5)?
            .set_default("nats.inbound_stream", "PAYMENT_PROCESSING")?
            .set_default("nats.inbound_subjects", vec!["payment-processing.>"])?
            .set_default("nats.inbound_subject", "payment-processing.payments")?
            .set_default("nats.durable_name", "fraud-scoring")?
            .set_default("nats.ack_wait_secs", 30)?
            .set_default("nats.max_deliver", 5)?
            .set_default("nats.max_concurrent", 16)?
            .set_default("nats.outbound_stream", "FRAUD_DETECTION")?
            .set_default("nats.outbound_subject", "fraud-detection.scorecards")?
            .set_default("nats.use_jetstream", true)?
            .set_default("nats.publish_timeout_ms", 5000)?
            .set_default("nats.max_retry_attempts", 3)?
            .set_default("nats.initial_retry_delay_ms", 100)?
            .set_default("nats.max_retry_delay_ms", 2000)?
            // History service defaults
            .set_default("history.endpoint", "http://localhost:50051")?
            .set_default("history.connect_timeout_ms", 2000)?
            .set_default("history.request_timeout_ms", 3000)?
            // Validation defaults
            .set_default("validation.min_amount", defaults.min_amount.to_string())?
            .set_default("validation.max_amount", defaults.max_amount.to_string())?
            .set_default("validation.supported_currencies", defaults.supported_currencies)?
            .set_default("validation.valid_statuses", defaults.valid_statuses)?
            .set_default("validation.document_pattern", defaults.document_pattern)?
            .set_default("validation.min_buyer_name_len", defaults.min_buyer_name_len as i64)?
            .set_default("validation.min_seller_id_len", defaults.min_seller_id_len as i64)?
            .set_default("validation.max_age_secs", defaults.max_age_secs)?
            .set_default("validation.clock_skew_secs", defaults.clock_skew_secs)?
            .set_default("validation.enforce", defaults.enforce)?;

        builder = builder.add_source(Environment::with_prefix("FRAUD_SCORING").separator("__"));

        // Override from environment variables
        if let Ok(port) = env::var("SERVICE_PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        if let Ok(nats_url) = env::var("NATS_URL") {
            builder = builder.set_override("nats.url", nats_url)?;
        }

        if let Ok(host) = env::var("USER_TRANSACTIONS_HOST") {
            builder = builder.set_override("history.endpoint", host)?;
        }

        builder.build()?.try_deserialize()
    }
}
