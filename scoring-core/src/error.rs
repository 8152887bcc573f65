//! Error types for fraud scoring

use crate::gateway::{GatewayError, SinkError};
use crate::orchestrator::Stage;
use thiserror::Error;

/// Fraud scoring error
#[derive(Debug, Error)]
pub enum Error {
    /// Transaction violated one or more preconditions
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Transaction cannot be normalized into an order
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Last order lookup failed or found nothing
    #[error("Fail to retrieve last order: {0}")]
    LastOrderNotFound(#[source] GatewayError),

    /// Average payment lookup failed or found nothing
    #[error("Fail to retrieve avg transactions: {0}")]
    AverageNotFound(#[source] GatewayError),

    /// Result sink rejected the scorecard
    #[error("Failed to publish scorecard: {0}")]
    Publish(#[source] SinkError),

    /// Shutdown was requested while the assessment was in flight
    #[error("Assessment cancelled while {0}")]
    Cancelled(Stage),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure kind, one label per alertable outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Validation`]
    ValidationFailure,
    /// See [`Error::InvalidOrder`]
    InvalidOrder,
    /// See [`Error::LastOrderNotFound`]
    LastOrderNotFound,
    /// See [`Error::AverageNotFound`]
    AverageNotFound,
    /// See [`Error::Publish`]
    PublishFailure,
    /// See [`Error::Cancelled`]
    Cancelled,
    /// See [`Error::InvalidConfig`]
    InvalidConfig,
}

impl ErrorKind {
    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::InvalidOrder => "invalid_order",
            ErrorKind::LastOrderNotFound => "last_order_not_found",
            ErrorKind::AverageNotFound => "average_not_found",
            ErrorKind::PublishFailure => "publish_failure",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidConfig => "invalid_config",
        }
    }

    /// Either history lookup failed
    pub fn is_history_lookup(&self) -> bool {
        matches!(self, ErrorKind::LastOrderNotFound | ErrorKind::AverageNotFound)
    }
}

impl Error {
    /// Kind of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::ValidationFailure,
            Error::InvalidOrder(_) => ErrorKind::InvalidOrder,
            Error::LastOrderNotFound(_) => ErrorKind::LastOrderNotFound,
            Error::AverageNotFound(_) => ErrorKind::AverageNotFound,
            Error::Publish(_) => ErrorKind::PublishFailure,
            Error::Cancelled(_) => ErrorKind::Cancelled,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Assessment stage the failure happened in
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Validation(_) | Error::InvalidOrder(_) => Some(Stage::Received),
            Error::LastOrderNotFound(_) | Error::AverageNotFound(_) => Some(Stage::Enriching),
            Error::Publish(_) => Some(Stage::Publishing),
            Error::Cancelled(stage) => Some(*stage),
            Error::InvalidConfig(_) => None,
        }
    }

    /// Validation violations, if this is a validation failure
    pub fn violations(&self) -> &[String] {
        match self {
            Error::Validation(violations) => violations,
            _ => &[],
        }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
