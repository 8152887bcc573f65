//! Rule chain
//!
//! Every rule reads the full evaluation input and returns the score of the
//! one factor it owns. The chain runs all rules in order and merges their
//! outcomes; no rule sees another rule's result.

use crate::types::{
    AveragePayment, Factor, LastOrder, Order, RiskFactors, NEUTRAL, STRONG_SIGNAL, WEAK_SIGNAL,
};
use std::fmt;
use tracing::trace;

/// Evaluation input for one assessment
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// Order being scored
    pub order: &'a Order,

    /// Buyer's previous order
    pub last_order: &'a LastOrder,

    /// Buyer's average payment
    pub average: &'a AveragePayment,
}

/// Single scoring rule
pub trait Rule: Send + Sync {
    /// Rule name for logs
    fn name(&self) -> &'static str;

    /// Factor this rule writes
    fn factor(&self) -> Factor;

    /// Score for the input; must be a pure function of it
    fn evaluate(&self, input: &RuleInput<'_>) -> i32;
}

/// Same amount as the last order
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueRule;

impl Rule for ValueRule {
    fn name(&self) -> &'static str {
        "value"
    }

    fn factor(&self) -> Factor {
        Factor::Value
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> i32 {
        if input.order.amount() == input.last_order.amount {
            STRONG_SIGNAL
        } else {
            NEUTRAL
        }
    }
}

/// Currency differs from the last order
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyRule;

impl Rule for CurrencyRule {
    fn name(&self) -> &'static str {
        "currency"
    }

    fn factor(&self) -> Factor {
        Factor::Currency
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> i32 {
        if input.order.currency().as_str() != input.last_order.currency {
            WEAK_SIGNAL
        } else {
            NEUTRAL
        }
    }
}

/// Same seller as the last order
#[derive(Debug, Clone, Copy, Default)]
pub struct SellerRule;

impl Rule for SellerRule {
    fn name(&self) -> &'static str {
        "seller"
    }

    fn factor(&self) -> Factor {
        Factor::Seller
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> i32 {
        if input.order.seller_id() == input.last_order.seller_id {
            WEAK_SIGNAL
        } else {
            NEUTRAL
        }
    }
}

/// Amount at or above the buyer's average payment
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageValueRule;

impl Rule for AverageValueRule {
    fn name(&self) -> &'static str {
        "average_value"
    }

    fn factor(&self) -> Factor {
        Factor::AverageValue
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> i32 {
        if input.order.amount() >= input.average.amount {
            STRONG_SIGNAL
        } else {
            NEUTRAL
        }
    }
}

/// Ordered collection of rules
pub struct RuleChain {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleChain {
    /// Empty chain
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Value, currency, seller and average value rules, in that order
    pub fn standard() -> Self {
        Self::new()
            .with_rule(ValueRule)
            .with_rule(CurrencyRule)
            .with_rule(SellerRule)
            .with_rule(AverageValueRule)
    }

    /// Append a rule to the end of the chain
    pub fn with_rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Chain has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in evaluation order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule and merge the outcomes
    pub fn evaluate(&self, input: &RuleInput<'_>) -> RiskFactors {
        let mut factors = RiskFactors::default();

        for rule in &self.rules {
            let score = rule.evaluate(input);
            trace!(
                rule = rule.name(),
                factor = %rule.factor(),
                score,
                payment_id = input.order.payment_id(),
                "rule evaluated"
            );
            factors.set(rule.factor(), score);
        }

        factors
    }
}

impl Default for RuleChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleChain")
            .field("rules", &self.rule_names())
            .finish()
    }
}
