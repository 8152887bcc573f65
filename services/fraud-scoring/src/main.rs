use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;
use fraud_scoring::{
    config::Config, handlers, CheckoutReceiver, GrpcHistoryGateway, NatsScoreCardSink,
};
use message_bus::{NatsClient, Publisher, Subscriber};
use scoring_core::{ScoringService, TransactionValidator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "fraud_scoring=info,scoring_core=info,message_bus=info";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Starting Fraud Scoring...");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        nats_url = %config.nats.url,
        history = %config.history.endpoint,
        enforce_validation = config.validation.enforce,
        "Configuration loaded"
    );

    let validator = TransactionValidator::new(config.validation.clone())?;

    // Connect to NATS
    let nats = Arc::new(NatsClient::connect(&config.nats.client_config()).await?);
    if config.nats.use_jetstream {
        nats.get_or_create_stream(
            &config.nats.outbound_stream,
            vec![config.nats.outbound_subject.clone()],
        )
        .await?;
    }

    // Outbound scorecards
    let publisher = Arc::new(Publisher::new(nats.clone(), config.nats.publisher_config()));
    let sink = Arc::new(NatsScoreCardSink::new(publisher, config.nats.outbound_subject.clone()));

    // Buyer history
    let history = Arc::new(GrpcHistoryGateway::connect(&config.history)?);

    let service = Arc::new(ScoringService::new(history, sink, validator));
    let receiver = Arc::new(CheckoutReceiver::new(service));

    // Inbound checkout events
    let cancel = CancellationToken::new();
    let subscriber = Subscriber::new(nats.clone(), config.nats.subscriber_config());
    let consumer_cancel = cancel.clone();
    let mut consumer =
        actix_web::rt::spawn(async move { subscriber.run(receiver, consumer_cancel).await });

    let health = web::Data::new(handlers::HealthState::new(nats.clone()));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(health.clone())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.clone(), config.server.port))?
    .run();

    info!(
        "HTTP server listening on {}:{}",
        config.server.host, config.server.port
    );

    let handle = server.handle();
    let mut server = actix_web::rt::spawn(server);

    // Whichever side stops first takes the other one down
    let consumer_result = tokio::select! {
        _ = &mut server => {
            info!("HTTP server stopped, draining consumer");
            cancel.cancel();
            consumer.await
        }
        result = &mut consumer => {
            error!("Consumer stopped, shutting down HTTP server");
            handle.stop(true).await;
            let _ = server.await;
            result
        }
    };

    match consumer_result {
        Ok(Ok(())) => {
            info!("Fraud Scoring stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "Consumer failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "Consumer task panicked");
            Err(e.into())
        }
    }
}
