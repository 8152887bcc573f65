//! Assessment orchestration
//!
//! One assessment walks the stages Received → Enriching → Scoring →
//! Publishing → Done. Both history lookups run concurrently; the sink is
//! only reached when both succeeded. A cancellation token aborts the
//! in-flight stage with [`Error::Cancelled`].

use crate::gateway::{HistoryGateway, ResultSink};
use crate::scoring::{RuleChain, RuleInput};
use crate::types::{Order, ScoreCard, Transaction};
use crate::validation::TransactionValidator;
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Assessment stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Transaction accepted for assessment
    Received,
    /// Looking up the buyer's history
    Enriching,
    /// Running the rule chain
    Scoring,
    /// Handing the scorecard to the sink
    Publishing,
    /// Scorecard delivered
    Done,
}

impl Stage {
    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Enriching => "enriching",
            Stage::Scoring => "scoring",
            Stage::Publishing => "publishing",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraud scoring service
pub struct ScoringService {
    gateway: Arc<dyn HistoryGateway>,
    sink: Arc<dyn ResultSink>,
    validator: TransactionValidator,
    rules: RuleChain,
    enforce_validation: bool,
}

impl ScoringService {
    /// Create a service with the standard rule chain
    pub fn new(
        gateway: Arc<dyn HistoryGateway>,
        sink: Arc<dyn ResultSink>,
        validator: TransactionValidator,
    ) -> Self {
        let enforce_validation = validator.config().enforce;
        Self {
            gateway,
            sink,
            validator,
            rules: RuleChain::standard(),
            enforce_validation,
        }
    }

    /// Replace the rule chain
    pub fn with_rules(mut self, rules: RuleChain) -> Self {
        self.rules = rules;
        self
    }

    /// Abort on validation violations (`true`) or only log them (`false`)
    pub fn enforce_validation(mut self, enforce: bool) -> Self {
        self.enforce_validation = enforce;
        self
    }

    /// Active rule chain
    pub fn rules(&self) -> &RuleChain {
        &self.rules
    }

    /// Validate, normalize and assess a raw transaction
    pub async fn assess_transaction(
        &self,
        tx: &Transaction,
        cancel: &CancellationToken,
    ) -> Result<ScoreCard> {
        let validation = self.validator.validate(tx);
        if !validation.is_valid {
            if self.enforce_validation {
                warn!(
                    payment_id = %tx.payment.id,
                    violations = ?validation.errors,
                    "Transaction rejected by validation"
                );
                return Err(Error::Validation(validation.errors));
            }
            warn!(
                payment_id = %tx.payment.id,
                violations = ?validation.errors,
                "Validation violations ignored, scoring anyway"
            );
        }

        let order = Order::try_from(tx)?;
        if !self.validator.supports_currency(order.currency().as_str()) {
            return Err(Error::InvalidOrder(format!(
                "unrecognized currency code '{}'",
                order.currency()
            )));
        }

        self.assess(&order, cancel).await
    }

    /// Assess a normalized order
    pub async fn assess(&self, order: &Order, cancel: &CancellationToken) -> Result<ScoreCard> {
        debug!(payment_id = order.payment_id(), stage = %Stage::Received, "Assessment started");

        if cancel.is_cancelled() {
            return Err(Error::Cancelled(Stage::Received));
        }

        debug!(payment_id = order.payment_id(), stage = %Stage::Enriching, "Looking up buyer history");
        let document = order.buyer_document();
        let lookups = async {
            tokio::join!(
                self.gateway.last_order(document),
                self.gateway.average_transactions(document, order.occurred_at()),
            )
        };

        let (last_order, average) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled(Stage::Enriching)),
            results = lookups => results,
        };

        let last_order = last_order.map_err(|e| {
            warn!(payment_id = order.payment_id(), error = %e, "Last order lookup failed");
            Error::LastOrderNotFound(e)
        })?;
        let average = average.map_err(|e| {
            warn!(payment_id = order.payment_id(), error = %e, "Average lookup failed");
            Error::AverageNotFound(e)
        })?;

        debug!(payment_id = order.payment_id(), stage = %Stage::Scoring, "Running rule chain");
        let factors = self.rules.evaluate(&RuleInput {
            order,
            last_order: &last_order,
            average: &average,
        });
        let card = ScoreCard::new(factors, order.clone());

        debug!(payment_id = order.payment_id(), stage = %Stage::Publishing, "Storing scorecard");
        let stored = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled(Stage::Publishing)),
            stored = self.sink.store(&card) => stored,
        };
        stored.map_err(Error::Publish)?;

        info!(
            payment_id = order.payment_id(),
            order_id = order.id(),
            total = card.total(),
            risk_level = ?card.risk_level(),
            value = factors.value_score,
            seller = factors.seller_score,
            currency = factors.currency_score,
            average_value = factors.average_value_score,
            stage = %Stage::Done,
            "Assessment completed"
        );

        Ok(card)
    }
}

impl fmt::Debug for ScoringService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringService")
            .field("rules", &self.rules)
            .field("enforce_validation", &self.enforce_validation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let stages = [
            Stage::Received,
            Stage::Enriching,
            Stage::Scoring,
            Stage::Publishing,
            Stage::Done,
        ];
        let labels: Vec<String> = stages.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, ["received", "enriching", "scoring", "publishing", "done"]);
    }
}
