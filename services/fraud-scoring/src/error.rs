use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Message bus error: {0}")]
    Bus(#[from] message_bus::Error),

    #[error("Scoring error: {0}")]
    Scoring(#[from] scoring_core::Error),

    #[error("gRPC error: {0}")]
    Grpc(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
