//! Transaction validation
//!
//! Every check runs on every transaction and each violation is reported;
//! the caller decides whether a failed result aborts scoring.

use crate::types::Transaction;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Smallest accepted amount (inclusive)
    pub min_amount: Decimal,

    /// Largest accepted amount (inclusive)
    pub max_amount: Decimal,

    /// Accepted ISO currency codes
    pub supported_currencies: Vec<String>,

    /// Accepted payment statuses
    pub valid_statuses: Vec<String>,

    /// Regex the buyer document must match
    pub document_pattern: String,

    /// Minimum buyer name length in characters
    pub min_buyer_name_len: usize,

    /// Minimum seller id length in characters
    pub min_seller_id_len: usize,

    /// Oldest accepted checkout, in seconds
    pub max_age_secs: i64,

    /// Accepted clock skew for checkouts in the future, in seconds
    pub clock_skew_secs: i64,

    /// Abort the assessment on violations (otherwise only log them)
    #[serde(default = "default_enforce")]
    pub enforce: bool,
}

fn default_enforce() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_amount: Decimal::new(100, 2),      // 1.00
            max_amount: Decimal::new(1_000_000, 2), // 10,000.00
            supported_currencies: ["USD", "EUR", "BRL", "JPY"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            valid_statuses: ["pending", "completed", "failed", "cancelled"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            document_pattern: r"^[0-9]{11}$".to_string(),
            min_buyer_name_len: 2,
            min_seller_id_len: 3,
            max_age_secs: 24 * 3600,
            clock_skew_secs: 3600,
            enforce: true,
        }
    }
}

/// Outcome of validating one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// No violation found
    pub is_valid: bool,

    /// Every violation found
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn violation(&mut self, message: &str) {
        self.is_valid = false;
        self.errors.push(message.to_string());
    }

    /// Turn a failed result into [`Error::Validation`]
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

/// Transaction validator
#[derive(Debug, Clone)]
pub struct TransactionValidator {
    config: ValidationConfig,
    max_age: Duration,
    clock_skew: Duration,
    document_regex: Regex,
    full_card_regex: Regex,
}

impl TransactionValidator {
    /// Create a validator; fails on an inverted amount range, a negative or
    /// unrepresentable time window, or a document pattern that does not compile
    pub fn new(config: ValidationConfig) -> Result<Self> {
        if config.min_amount > config.max_amount {
            return Err(Error::InvalidConfig(format!(
                "min_amount {} is greater than max_amount {}",
                config.min_amount, config.max_amount
            )));
        }

        let max_age = time_window("max_age_secs", config.max_age_secs)?;
        let clock_skew = time_window("clock_skew_secs", config.clock_skew_secs)?;

        let document_regex = Regex::new(&config.document_pattern).map_err(|e| {
            Error::InvalidConfig(format!(
                "invalid document pattern '{}': {}",
                config.document_pattern, e
            ))
        })?;

        Ok(Self {
            config,
            max_age,
            clock_skew,
            document_regex,
            full_card_regex: Regex::new(r"^[0-9]{16}$")
                .map_err(|e| Error::InvalidConfig(e.to_string()))?,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Accepted currencies
    pub fn supported_currencies(&self) -> &[String] {
        &self.config.supported_currencies
    }

    /// Currency code is in the configured set
    pub fn supports_currency(&self, code: &str) -> bool {
        self.config.supported_currencies.iter().any(|c| c == code)
    }

    /// Accepted amount range
    pub fn limits(&self) -> (Decimal, Decimal) {
        (self.config.min_amount, self.config.max_amount)
    }

    /// Maximum checkout age
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Future clock skew tolerance
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Validate against the current time
    pub fn validate(&self, tx: &Transaction) -> ValidationResult {
        self.validate_at(tx, Utc::now())
    }

    /// Validate against an explicit reference time
    pub fn validate_at(&self, tx: &Transaction, now: DateTime<Utc>) -> ValidationResult {
        let mut result = ValidationResult::new();

        self.check_identifiers(tx, &mut result);
        self.check_amount(tx, &mut result);
        self.check_currency(tx, &mut result);
        self.check_status(tx, &mut result);
        self.check_buyer(tx, &mut result);
        self.check_seller(tx, &mut result);
        self.check_card(tx, &mut result);
        self.check_timestamp(tx, now, &mut result);

        result
    }

    fn check_identifiers(&self, tx: &Transaction, result: &mut ValidationResult) {
        if tx.payment.id.is_empty() {
            result.violation("payment ID is required");
        }
        if tx.checkout.id.is_empty() {
            result.violation("checkout ID is required");
        }
    }

    fn check_amount(&self, tx: &Transaction, result: &mut ValidationResult) {
        let raw = tx.payment.amount.trim();
        if raw.is_empty() {
            result.violation("payment amount is required");
            return;
        }

        match Decimal::from_str(raw) {
            Ok(amount) if amount < self.config.min_amount => {
                result.violation("payment amount below minimum threshold")
            }
            Ok(amount) if amount > self.config.max_amount => {
                result.violation("payment amount exceeds maximum threshold")
            }
            Ok(_) => {}
            Err(_) => result.violation("invalid payment amount format"),
        }
    }

    fn check_currency(&self, tx: &Transaction, result: &mut ValidationResult) {
        let currency = &tx.payment.currency;
        if currency.is_empty() {
            result.violation("payment currency is required");
        } else if !self.supports_currency(currency) {
            result.violation("unsupported currency");
        }
    }

    fn check_status(&self, tx: &Transaction, result: &mut ValidationResult) {
        if !self.config.valid_statuses.iter().any(|s| *s == tx.payment.status) {
            result.violation("invalid payment status");
        }
    }

    fn check_buyer(&self, tx: &Transaction, result: &mut ValidationResult) {
        let buyer = &tx.participants.buyer;

        if buyer.document.is_empty() {
            result.violation("buyer document is required");
        } else if !self.document_regex.is_match(&buyer.document) {
            result.violation("invalid buyer document format");
        }

        if buyer.name.is_empty() {
            result.violation("buyer name is required");
        } else if buyer.name.chars().count() < self.config.min_buyer_name_len {
            result.violation("buyer name too short");
        }
    }

    fn check_seller(&self, tx: &Transaction, result: &mut ValidationResult) {
        let seller_id = &tx.participants.seller.seller_id;
        if seller_id.is_empty() {
            result.violation("seller ID is required");
        } else if seller_id.chars().count() < self.config.min_seller_id_len {
            result.violation("seller ID too short");
        }
    }

    fn check_card(&self, tx: &Transaction, result: &mut ValidationResult) {
        let card = &tx.checkout.card;

        if card.token.is_empty() {
            result.violation("payment token is required");
        }

        if card.card_info.is_empty() {
            result.violation("card info is required");
        } else if !card.is_masked() && !self.full_card_regex.is_match(&card.card_info) {
            result.violation("invalid card info format");
        }
    }

    fn check_timestamp(&self, tx: &Transaction, now: DateTime<Utc>, result: &mut ValidationResult) {
        let Some(at) = tx.checkout.occurred_at else {
            result.violation("checkout timestamp is required");
            return;
        };

        if !tx.checkout.is_recent(self.max_age, now) {
            result.violation("transaction too old");
        }
        // A window past the representable range never triggers
        if now.checked_add_signed(self.clock_skew).is_some_and(|latest| at > latest) {
            result.violation("transaction timestamp is in the future");
        }
    }
}

fn time_window(name: &str, secs: i64) -> Result<Duration> {
    if secs < 0 {
        return Err(Error::InvalidConfig(format!("{} must not be negative, got {}", name, secs)));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| Error::InvalidConfig(format!("{} is out of range: {}", name, secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuyerInfo, CardInfo, Checkout, Participants, Payment, SellerInfo};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn valid_transaction() -> Transaction {
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
                occurred_at: Some(now() - Duration::hours(1)),
            },
            payment: Payment {
                id: "payment-789".to_string(),
                amount: "100.00".to_string(),
                currency: "USD".to_string(),
                status: "completed".to_string(),
            },
        }
    }

    fn validator() -> TransactionValidator {
        TransactionValidator::new(ValidationConfig::default()).unwrap()
    }

    fn errors_for(tx: &Transaction) -> Vec<String> {
        validator().validate_at(tx, now()).errors
    }

    #[test]
    fn test_valid_transaction() {
        let result = validator().validate_at(&valid_transaction(), now());
        assert!(result.is_valid, "unexpected errors: {:?}", result.errors);
        assert!(result.errors.is_empty());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_missing_identifiers() {
        let mut tx = valid_transaction();
        tx.payment.id.clear();
        assert_eq!(errors_for(&tx), vec!["payment ID is required"]);

        let mut tx = valid_transaction();
        tx.checkout.id.clear();
        assert_eq!(errors_for(&tx), vec!["checkout ID is required"]);
    }

    #[test]
    fn test_amount_checks() {
        let cases = [
            ("", Some("payment amount is required")),
            ("abc", Some("invalid payment amount format")),
            ("1.00", None),
            ("10000.00", None),
            ("0.99", Some("payment amount below minimum threshold")),
            ("10000.01", Some("payment amount exceeds maximum threshold")),
            ("-5", Some("payment amount below minimum threshold")),
        ];

        for (amount, expected) in cases {
            let mut tx = valid_transaction();
            tx.payment.amount = amount.to_string();
            let errors = errors_for(&tx);
            match expected {
                Some(message) => assert_eq!(errors, vec![message], "amount {:?}", amount),
                None => assert!(errors.is_empty(), "amount {:?}: {:?}", amount, errors),
            }
        }
    }

    #[test]
    fn test_currency_checks() {
        for currency in ["USD", "EUR", "BRL", "JPY"] {
            let mut tx = valid_transaction();
            tx.payment.currency = currency.to_string();
            assert!(errors_for(&tx).is_empty(), "currency {}", currency);
        }

        let mut tx = valid_transaction();
        tx.payment.currency = "GBP".to_string();
        assert_eq!(errors_for(&tx), vec!["unsupported currency"]);

        tx.payment.currency.clear();
        assert_eq!(errors_for(&tx), vec!["payment currency is required"]);
    }

    #[test]
    fn test_status_checks() {
        for status in ["pending", "completed", "failed", "cancelled"] {
            let mut tx = valid_transaction();
            tx.payment.status = status.to_string();
            assert!(errors_for(&tx).is_empty(), "status {}", status);
        }

        let mut tx = valid_transaction();
        tx.payment.status = "refunded".to_string();
        assert_eq!(errors_for(&tx), vec!["invalid payment status"]);
    }

    #[test]
    fn test_buyer_checks() {
        let mut tx = valid_transaction();
        tx.participants.buyer.document.clear();
        assert_eq!(errors_for(&tx), vec!["buyer document is required"]);

        for document in ["1234567890", "123456789012", "1234567890a"] {
            let mut tx = valid_transaction();
            tx.participants.buyer.document = document.to_string();
            assert_eq!(errors_for(&tx), vec!["invalid buyer document format"], "{}", document);
        }

        let mut tx = valid_transaction();
        tx.participants.buyer.name.clear();
        assert_eq!(errors_for(&tx), vec!["buyer name is required"]);

        tx.participants.buyer.name = "J".to_string();
        assert_eq!(errors_for(&tx), vec!["buyer name too short"]);

        tx.participants.buyer.name = "Jo".to_string();
        assert!(errors_for(&tx).is_empty());
    }

    #[test]
    fn test_seller_checks() {
        let mut tx = valid_transaction();
        tx.participants.seller.seller_id.clear();
        assert_eq!(errors_for(&tx), vec!["seller ID is required"]);

        tx.participants.seller.seller_id = "ab".to_string();
        assert_eq!(errors_for(&tx), vec!["seller ID too short"]);

        tx.participants.seller.seller_id = "abc".to_string();
        assert!(errors_for(&tx).is_empty());
    }

    #[test]
    fn test_card_checks() {
        for card in ["****1234", "1234567890123456"] {
            let mut tx = valid_transaction();
            tx.checkout.card.card_info = card.to_string();
            assert!(errors_for(&tx).is_empty(), "card {}", card);
        }

        for card in ["***1234", "****123", "*****1234", "123456789012345", "****abcd"] {
            let mut tx = valid_transaction();
            tx.checkout.card.card_info = card.to_string();
            assert_eq!(errors_for(&tx), vec!["invalid card info format"], "card {}", card);
        }

        let mut tx = valid_transaction();
        tx.checkout.card.card_info.clear();
        assert_eq!(errors_for(&tx), vec!["card info is required"]);

        let mut tx = valid_transaction();
        tx.checkout.card.token.clear();
        assert_eq!(errors_for(&tx), vec!["payment token is required"]);
    }

    #[test]
    fn test_timestamp_checks() {
        let mut tx = valid_transaction();
        tx.checkout.occurred_at = None;
        assert_eq!(errors_for(&tx), vec!["checkout timestamp is required"]);

        tx.checkout.occurred_at = Some(now() - Duration::hours(25));
        assert_eq!(errors_for(&tx), vec!["transaction too old"]);

        tx.checkout.occurred_at = Some(now() - Duration::hours(24));
        assert!(errors_for(&tx).is_empty());

        tx.checkout.occurred_at = Some(now() + Duration::minutes(30));
        assert!(errors_for(&tx).is_empty());

        tx.checkout.occurred_at = Some(now() + Duration::hours(2));
        assert_eq!(errors_for(&tx), vec!["transaction timestamp is in the future"]);
    }

    #[test]
    fn test_reports_every_violation() {
        let mut tx = valid_transaction();
        tx.payment.id.clear();
        tx.checkout.id.clear();
        tx.payment.amount.clear();
        tx.payment.currency.clear();
        tx.participants.buyer.document.clear();
        tx.participants.seller.seller_id.clear();

        let result = validator().validate_at(&tx, now());
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec![
                "payment ID is required",
                "checkout ID is required",
                "payment amount is required",
                "payment currency is required",
                "buyer document is required",
                "seller ID is required",
            ]
        );

        match result.into_result() {
            Err(Error::Validation(violations)) => assert_eq!(violations.len(), 6),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_configuration() {
        let config = ValidationConfig {
            document_pattern: "([0-9".to_string(),
            ..ValidationConfig::default()
        };
        assert!(matches!(TransactionValidator::new(config), Err(Error::InvalidConfig(_))));

        let config = ValidationConfig {
            min_amount: Decimal::new(10, 0),
            max_amount: Decimal::new(1, 0),
            ..ValidationConfig::default()
        };
        assert!(matches!(TransactionValidator::new(config), Err(Error::InvalidConfig(_))));

        let config = ValidationConfig {
            max_age_secs: -1,
            ..ValidationConfig::default()
        };
        assert!(matches!(TransactionValidator::new(config), Err(Error::InvalidConfig(_))));

        for clock_skew_secs in [i64::MAX, i64::MIN, -60] {
            let config = ValidationConfig {
                clock_skew_secs,
                ..ValidationConfig::default()
            };
            assert!(matches!(TransactionValidator::new(config), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_widest_windows_do_not_panic() {
        // largest whole-second span chrono accepts
        let widest = i64::MAX / 1_000;
        let v = TransactionValidator::new(ValidationConfig {
            max_age_secs: widest,
            clock_skew_secs: widest,
            ..ValidationConfig::default()
        })
        .unwrap();

        let result = v.validate_at(&valid_transaction(), now());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_accessors() {
        let v = validator();
        assert_eq!(v.supported_currencies(), ["USD", "EUR", "BRL", "JPY"]);
        assert_eq!(v.limits(), (Decimal::new(1, 0), Decimal::new(10_000, 0)));
        assert_eq!(v.max_age(), Duration::hours(24));
        assert_eq!(v.clock_skew(), Duration::hours(1));
        assert!(v.supports_currency("BRL"));
        assert!(!v.supports_currency("ZZZ"));
    }
}
