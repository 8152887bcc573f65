//! Bus-level Prometheus metrics, labelled by NATS subject

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};
use std::time::Duration;

const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 10.0];

lazy_static! {
    pub static ref PUBLISH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "message_bus_publish_total",
        "Events published, by subject and outcome",
        &["subject", "status"]
    )
    .expect("metric can be created");

    pub static ref PUBLISH_DURATION: HistogramVec = register_histogram_vec!(
        "message_bus_publish_duration_seconds",
        "Publish latency including retries",
        &["subject"],
        LATENCY_BUCKETS.to_vec()
    )
    .expect("metric can be created");

    /// Received messages, by the disposition they were settled with
    pub static ref RECEIVE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "message_bus_receive_total",
        "Messages received, by subject and settlement",
        &["subject", "status"]
    )
    .expect("metric can be created");

    pub static ref PROCESS_DURATION: HistogramVec = register_histogram_vec!(
        "message_bus_process_duration_seconds",
        "Handler time per message",
        &["subject"],
        LATENCY_BUCKETS.to_vec()
    )
    .expect("metric can be created");
}

pub(crate) fn record_publish(subject: &str, ok: bool, elapsed: Duration) {
    PUBLISH_DURATION
        .with_label_values(&[subject])
        .observe(elapsed.as_secs_f64());
    PUBLISH_TOTAL
        .with_label_values(&[subject, if ok { "success" } else { "error" }])
        .inc();
}

pub(crate) fn record_receive(subject: &str, status: &str, elapsed: Duration) {
    PROCESS_DURATION
        .with_label_values(&[subject])
        .observe(elapsed.as_secs_f64());
    RECEIVE_TOTAL.with_label_values(&[subject, status]).inc();
}
