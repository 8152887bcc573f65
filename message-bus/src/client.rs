//! NATS connection and JetStream context

use crate::{Error, Result};
use async_nats::connection::State;
use async_nats::jetstream::{self, stream};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// Server URL
    pub url: String,

    /// Connection name reported to the server
    pub name: String,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            name: "fraud-scoring".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Shared NATS client with its JetStream context
#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    /// Connect to the server
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = async_nats::ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(config.url.as_str())
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let jetstream = jetstream::new(client.clone());

        info!("Connected to NATS at {}", config.url);
        Ok(Self { client, jetstream })
    }

    /// Core NATS client
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// JetStream context
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Connection is currently established
    pub fn is_connected(&self) -> bool {
        self.client.connection_state() == State::Connected
    }

    /// Look up a stream, creating it with the given subjects when missing
    pub async fn get_or_create_stream(
        &self,
        name: &str,
        subjects: Vec<String>,
    ) -> Result<stream::Stream> {
        if let Ok(stream) = self.jetstream.get_stream(name).await {
            return Ok(stream);
        }

        info!("Creating stream {} with subjects {:?}", name, subjects);
        self.jetstream
            .create_stream(stream::Config {
                name: name.to_string(),
                subjects,
                max_age: Duration::from_secs(7 * 24 * 3600), // 7 days
                duplicate_window: Duration::from_secs(120),
                ..Default::default()
            })
            .await
            .map_err(|e| Error::JetStream(format!("create stream {}: {}", name, e)))
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient")
            .field("state", &self.client.connection_state())
            .finish()
    }
}
