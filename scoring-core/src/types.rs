//! Core types for fraud scoring

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Inbound transaction (validation input)
// ============================================================================

/// Checkout transaction as received from the payment platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Buyer and seller
    pub participants: Participants,

    /// Checkout details
    pub checkout: Checkout,

    /// Payment line item
    pub payment: Payment,
}

/// Parties involved in a transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Participants {
    /// Buyer
    pub buyer: BuyerInfo,

    /// Seller
    pub seller: SellerInfo,
}

/// Buyer identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerInfo {
    /// National document number
    pub document: String,

    /// Full name
    pub name: String,
}

/// Seller identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SellerInfo {
    /// Seller identifier
    pub seller_id: String,
}

/// Checkout session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    /// Checkout (order) id
    pub id: String,

    /// Card used for payment
    pub card: CardInfo,

    /// When the checkout happened
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Checkout {
    /// Checkout happened no longer than `max_age` before `now`
    pub fn is_recent(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.occurred_at {
            Some(at) => now
                .checked_sub_signed(max_age)
                .map_or(true, |oldest| at >= oldest),
            None => false,
        }
    }
}

/// Card reference and payment token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Masked (`****1234`) or full card number
    pub card_info: String,

    /// Payment token
    pub token: String,
}

impl CardInfo {
    /// Card reference is in masked form: `****` followed by four digits
    pub fn is_masked(&self) -> bool {
        self.card_info.len() == 8
            && self.card_info.starts_with("****")
            && self.card_info[4..].chars().all(|c| c.is_ascii_digit())
    }
}

/// Payment line item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id
    pub id: String,

    /// Amount as sent on the wire
    pub amount: String,

    /// ISO 4217 currency code
    pub currency: String,

    /// Payment status (`pending`, `completed`, ...)
    pub status: String,
}

impl Payment {
    /// Parse the wire amount into a decimal
    pub fn parsed_amount(&self) -> Result<Decimal> {
        parse_amount(&self.amount)
    }
}

/// Parse a monetary amount string into its canonical decimal form
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidOrder("amount is empty".to_string()));
    }
    Decimal::from_str(trimmed)
        .map(|d| d.normalize())
        .map_err(|e| Error::InvalidOrder(format!("invalid amount '{}': {}", raw, e)))
}

// ============================================================================
// Normalized order
// ============================================================================

/// ISO 4217 currency code (three uppercase ASCII letters).
///
/// Only the shape is checked here. Whether the code is recognized is decided
/// against the configured currency set by the scoring service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse and check a currency code
    pub fn parse(code: &str) -> Result<Self> {
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(Error::InvalidOrder(format!("unrecognized currency code '{}'", code)))
        }
    }

    /// Code as string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Currency::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized order to be scored.
///
/// Fields are private: an `Order` only exists once its identifiers are
/// non-empty, its amount is a non-negative decimal and its currency parses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    payment_id: String,
    amount: Decimal,
    currency: Currency,
    seller_id: String,
    buyer_document: String,
    occurred_at: DateTime<Utc>,
}

impl Order {
    /// Build an order, enforcing its invariants
    pub fn new(
        id: impl Into<String>,
        payment_id: impl Into<String>,
        amount: Decimal,
        currency: Currency,
        seller_id: impl Into<String>,
        buyer_document: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self> {
        let order = Self {
            id: id.into(),
            payment_id: payment_id.into(),
            amount: amount.normalize(),
            currency,
            seller_id: seller_id.into(),
            buyer_document: buyer_document.into(),
            occurred_at,
        };

        if order.id.is_empty() {
            return Err(Error::InvalidOrder("order id is empty".to_string()));
        }
        if order.buyer_document.is_empty() {
            return Err(Error::InvalidOrder("buyer document is empty".to_string()));
        }
        if order.seller_id.is_empty() {
            return Err(Error::InvalidOrder("seller id is empty".to_string()));
        }
        if order.amount < Decimal::ZERO {
            return Err(Error::InvalidOrder(format!(
                "amount {} is negative",
                order.amount
            )));
        }

        Ok(order)
    }

    /// Checkout (order) id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Payment id of this line item
    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    /// Canonical amount
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Currency
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Seller id
    pub fn seller_id(&self) -> &str {
        &self.seller_id
    }

    /// Buyer document
    pub fn buyer_document(&self) -> &str {
        &self.buyer_document
    }

    /// Checkout timestamp
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl TryFrom<&Transaction> for Order {
    type Error = Error;

    fn try_from(tx: &Transaction) -> Result<Self> {
        let occurred_at = tx
            .checkout
            .occurred_at
            .ok_or_else(|| Error::InvalidOrder("checkout timestamp is missing".to_string()))?;

        Order::new(
            tx.checkout.id.clone(),
            tx.payment.id.clone(),
            tx.payment.parsed_amount()?,
            Currency::parse(&tx.payment.currency)?,
            tx.participants.seller.seller_id.clone(),
            tx.participants.buyer.document.clone(),
            occurred_at,
        )
    }
}

// ============================================================================
// History snapshots
// ============================================================================

/// Buyer's most recent prior order, as reported by the history service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastOrder {
    /// Seller of the last order
    pub seller_id: String,

    /// Currency of the last order
    pub currency: String,

    /// Amount of the last order
    pub amount: Decimal,
}

/// Buyer's average payment for a billing period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragePayment {
    /// Billing period (`YYYY-MM`)
    pub month: String,

    /// Average amount
    pub amount: Decimal,
}

// ============================================================================
// Risk factors and scorecard
// ============================================================================

/// Strong risk signal
pub const STRONG_SIGNAL: i32 = -3;

/// Weak risk signal
pub const WEAK_SIGNAL: i32 = -1;

/// No signal
pub const NEUTRAL: i32 = 0;

/// Scored dimension; each rule owns exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    /// Repeated amount
    Value,
    /// Same seller as last order
    Seller,
    /// Currency switch
    Currency,
    /// Spending at or above average
    AverageValue,
}

impl Factor {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Value => "value",
            Factor::Seller => "seller",
            Factor::Currency => "currency",
            Factor::AverageValue => "average_value",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signed score per evaluated dimension
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    /// Value rule outcome
    pub value_score: i32,

    /// Seller rule outcome
    pub seller_score: i32,

    /// Currency rule outcome
    pub currency_score: i32,

    /// Average value rule outcome
    pub average_value_score: i32,
}

impl RiskFactors {
    /// Write a single factor, leaving the others untouched
    pub fn set(&mut self, factor: Factor, score: i32) {
        match factor {
            Factor::Value => self.value_score = score,
            Factor::Seller => self.seller_score = score,
            Factor::Currency => self.currency_score = score,
            Factor::AverageValue => self.average_value_score = score,
        }
    }

    /// Read a single factor
    pub fn get(&self, factor: Factor) -> i32 {
        match factor {
            Factor::Value => self.value_score,
            Factor::Seller => self.seller_score,
            Factor::Currency => self.currency_score,
            Factor::AverageValue => self.average_value_score,
        }
    }

    /// Sum of all factors
    pub fn total(&self) -> i32 {
        self.value_score + self.seller_score + self.currency_score + self.average_value_score
    }
}

/// Operator-facing risk bucket derived from a scorecard total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No signal fired
    Low,
    /// Total between -1 and -3
    Medium,
    /// Total between -4 and -6
    High,
    /// Total of -7 or less
    Critical,
}

impl From<i32> for RiskLevel {
    fn from(total: i32) -> Self {
        match total {
            t if t >= 0 => RiskLevel::Low,
            t if t >= -3 => RiskLevel::Medium,
            t if t >= -6 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Single factor wrapped for the published payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FactorScore {
    /// Score
    pub score: i32,
}

/// Published score breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Value rule
    pub value_score: FactorScore,

    /// Seller rule
    pub seller_score: FactorScore,

    /// Average value rule
    pub average_value_score: FactorScore,

    /// Currency rule
    pub currency_score: FactorScore,
}

impl From<RiskFactors> for ScoreBreakdown {
    fn from(factors: RiskFactors) -> Self {
        Self {
            value_score: FactorScore { score: factors.value_score },
            seller_score: FactorScore { score: factors.seller_score },
            average_value_score: FactorScore { score: factors.average_value_score },
            currency_score: FactorScore { score: factors.currency_score },
        }
    }
}

/// Result of one assessment, handed to the result sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    score: ScoreBreakdown,
    transaction: Order,
    #[serde(skip)]
    factors: RiskFactors,
}

impl ScoreCard {
    /// Assemble a scorecard from rule outcomes and the scored order
    pub fn new(factors: RiskFactors, order: Order) -> Self {
        Self {
            score: ScoreBreakdown::from(factors),
            transaction: order,
            factors,
        }
    }

    /// Rule outcomes
    pub fn factors(&self) -> RiskFactors {
        self.factors
    }

    /// Published breakdown
    pub fn score(&self) -> &ScoreBreakdown {
        &self.score
    }

    /// Scored order snapshot
    pub fn order(&self) -> &Order {
        &self.transaction
    }

    /// Sum of all factors (-8..=0)
    pub fn total(&self) -> i32 {
        self.factors.total()
    }

    /// Risk bucket for dashboards
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from(self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transaction() -> Transaction {
        Transaction {
            participants: Participants {
                buyer: BuyerInfo {
                    document: "12345678901".to_string(),
                    name: "John Doe".to_string(),
                },
                seller: SellerInfo {
                    seller_id: "seller-123".to_string(),
                },
            },
            checkout: Checkout {
                id: "order-456".to_string(),
                card: CardInfo {
                    card_info: "****1234".to_string(),
                    token: "tok_123".to_string(),
                },
                occurred_at: Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()),
            },
            payment: Payment {
                id: "payment-789".to_string(),
                amount: "100.00".to_string(),
                currency: "USD".to_string(),
                status: "completed".to_string(),
            },
        }
    }

    #[test]
    fn test_parse_amount_is_canonical() {
        assert_eq!(parse_amount("100.00").unwrap(), parse_amount("100").unwrap());
        assert_eq!(parse_amount(" 0.50 ").unwrap(), Decimal::new(5, 1));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("invalid").is_err());
    }

    #[test]
    fn test_payment_helpers() {
        let payment = transaction().payment;
        assert_eq!(payment.parsed_amount().unwrap(), Decimal::new(100, 0));
    }

    #[test]
    fn test_checkout_is_recent() {
        let tx = transaction();
        let at = tx.checkout.occurred_at.unwrap();
        assert!(tx.checkout.is_recent(Duration::hours(24), at + Duration::hours(2)));
        assert!(!tx.checkout.is_recent(Duration::hours(24), at + Duration::hours(25)));
        assert!(!Checkout::default().is_recent(Duration::hours(24), at));
        assert!(tx.checkout.is_recent(Duration::MAX, at + Duration::hours(25)));
    }

    #[test]
    fn test_card_is_masked() {
        let mut card = transaction().checkout.card;
        assert!(card.is_masked());

        card.card_info = "1234567890123456".to_string();
        assert!(!card.is_masked());

        for card_info in ["***1234", "****123", "*****1234", "****abcd"] {
            card.card_info = card_info.to_string();
            assert!(!card.is_masked(), "{}", card_info);
        }
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("EUR").unwrap().as_str(), "EUR");
        assert!(Currency::parse("eur").is_err());
        assert!(Currency::parse("EURO").is_err());
        assert!(Currency::parse("").is_err());
    }

    #[test]
    fn test_order_from_transaction() {
        let order = Order::try_from(&transaction()).unwrap();
        assert_eq!(order.id(), "order-456");
        assert_eq!(order.payment_id(), "payment-789");
        assert_eq!(order.amount(), Decimal::new(100, 0));
        assert_eq!(order.currency().as_str(), "USD");
        assert_eq!(order.seller_id(), "seller-123");
        assert_eq!(order.buyer_document(), "12345678901");
    }

    #[test]
    fn test_order_invariants() {
        let mut tx = transaction();
        tx.checkout.id.clear();
        assert!(matches!(Order::try_from(&tx), Err(Error::InvalidOrder(_))));

        let mut tx = transaction();
        tx.payment.amount = "-1.00".to_string();
        assert!(matches!(Order::try_from(&tx), Err(Error::InvalidOrder(_))));

        let mut tx = transaction();
        tx.checkout.occurred_at = None;
        assert!(matches!(Order::try_from(&tx), Err(Error::InvalidOrder(_))));

        let mut tx = transaction();
        tx.payment.amount = "0".to_string();
        assert!(Order::try_from(&tx).is_ok());
    }

    #[test]
    fn test_risk_factors_set_only_touches_one_field() {
        let mut factors = RiskFactors::default();
        factors.set(Factor::Seller, WEAK_SIGNAL);

        assert_eq!(factors.seller_score, -1);
        assert_eq!(factors.value_score, 0);
        assert_eq!(factors.currency_score, 0);
        assert_eq!(factors.average_value_score, 0);
        assert_eq!(factors.get(Factor::Seller), -1);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from(-1), RiskLevel::Medium);
        assert_eq!(RiskLevel::from(-3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from(-4), RiskLevel::High);
        assert_eq!(RiskLevel::from(-6), RiskLevel::High);
        assert_eq!(RiskLevel::from(-7), RiskLevel::Critical);
        assert_eq!(RiskLevel::from(-8), RiskLevel::Critical);
    }

    #[test]
    fn test_scorecard_serialization_shape() {
        let factors = RiskFactors {
            value_score: -3,
            seller_score: -1,
            currency_score: 0,
            average_value_score: -3,
        };
        let card = ScoreCard::new(factors, Order::try_from(&transaction()).unwrap());
        let json = serde_json::to_value(&card).unwrap();

        assert_eq!(json["score"]["valueScore"]["score"], -3);
        assert_eq!(json["score"]["sellerScore"]["score"], -1);
        assert_eq!(json["score"]["currencyScore"]["score"], 0);
        assert_eq!(json["score"]["averageValueScore"]["score"], -3);
        assert_eq!(json["transaction"]["paymentId"], "payment-789");
        assert_eq!(json["transaction"]["amount"], "100");
        assert_eq!(json["transaction"]["currency"], "USD");
        assert!(json.get("factors").is_none());
        assert_eq!(card.total(), -7);
        assert_eq!(card.risk_level(), RiskLevel::Critical);
    }
}
