use crate::metrics;
use actix_web::{web, HttpResponse};
use message_bus::NatsClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Broker connectivity as seen by the health endpoint
pub trait ConnectionProbe: Send + Sync {
    fn is_connected(&self) -> bool;
}

impl ConnectionProbe for NatsClient {
    fn is_connected(&self) -> bool {
        NatsClient::is_connected(self)
    }
}

pub struct HealthState {
    probe: Arc<dyn ConnectionProbe>,
    started: Instant,
}

impl HealthState {
    pub fn new(probe: Arc<dyn ConnectionProbe>) -> Self {
        Self {
            probe,
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub nats: &'static str,
    pub uptime_seconds: u64,
}

// ===== Health Check =====
pub async fn health_check(state: web::Data<HealthState>) -> HttpResponse {
    let connected = state.probe.is_connected();

    let body = HealthResponse {
        status: if connected { "healthy" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        nats: if connected { "connected" } else { "disconnected" },
        uptime_seconds: state.started.elapsed().as_secs(),
    };

    if connected {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

// ===== Prometheus =====
pub async fn metrics_handler() -> HttpResponse {
    match metrics::metrics_text() {
        Ok(text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(text),
        Err(e) => {
            error!("Failed to export metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_handler));
}
