use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use scoring_core::{Factor, ScoreCard};
use std::time::Duration;

lazy_static! {
    pub static ref ASSESSMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fraud_scoring_assessments_total",
        "Assessments by outcome (scored or error kind)",
        &["outcome"]
    )
    .expect("metric can be created");

    pub static ref ASSESSMENT_DURATION: Histogram = register_histogram!(
        "fraud_scoring_assessment_duration_seconds",
        "Assessment duration in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("metric can be created");

    pub static ref RISK_FACTOR_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fraud_scoring_risk_factor_total",
        "Rule outcomes by factor and score",
        &["factor", "score"]
    )
    .expect("metric can be created");

    pub static ref EVENTS_IGNORED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fraud_scoring_events_ignored_total",
        "Inbound events skipped because of their type",
        &["kind"]
    )
    .expect("metric can be created");
}

/// Outcome label for a successful assessment
pub const OUTCOME_SCORED: &str = "scored";

/// Label for any inbound event type other than payment created
pub const IGNORED_OTHER: &str = "other";

/// Outcome label for an event whose payload could not be read
pub const OUTCOME_MALFORMED: &str = "malformed";

/// Record one finished assessment
pub fn observe_assessment(result: &scoring_core::Result<ScoreCard>, elapsed: Duration) {
    ASSESSMENT_DURATION.observe(elapsed.as_secs_f64());

    match result {
        Ok(card) => {
            ASSESSMENTS_TOTAL.with_label_values(&[OUTCOME_SCORED]).inc();

            let factors = card.factors();
            for factor in [Factor::Value, Factor::Seller, Factor::Currency, Factor::AverageValue] {
                let score = factors.get(factor).to_string();
                RISK_FACTOR_TOTAL
                    .with_label_values(&[factor.as_str(), score.as_str()])
                    .inc();
            }
        }
        Err(e) => {
            ASSESSMENTS_TOTAL.with_label_values(&[e.kind().as_str()]).inc();
        }
    }
}

/// Generate metrics output in Prometheus text format
pub fn metrics_text() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
