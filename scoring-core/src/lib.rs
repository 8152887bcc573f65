//! Fraud scoring core
//!
//! Deterministic risk scorecards for checkout payments: a transaction is
//! validated, enriched with the buyer's history, run through the rule chain
//! and the resulting scorecard is handed to a result sink.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod scoring;
pub mod types;
pub mod validation;

pub use error::{Error, ErrorKind, Result};
pub use gateway::{GatewayError, HistoryGateway, ResultSink, SinkError};
pub use orchestrator::{ScoringService, Stage};
pub use scoring::{Rule, RuleChain, RuleInput};
pub use types::*;
pub use validation::{TransactionValidator, ValidationConfig, ValidationResult};
