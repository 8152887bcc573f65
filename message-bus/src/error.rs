use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to connect to NATS: {0}")]
    Connection(String),

    #[error("Failed to publish to {subject}: {reason}")]
    Publish { subject: String, reason: String },

    #[error("Failed to open message stream: {0}")]
    Subscribe(String),

    /// Stream or consumer setup, or a missing publish ack
    #[error("JetStream error: {0}")]
    JetStream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// Whether another attempt of the same operation can succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Publish { .. } | Error::JetStream(_) | Error::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
