//! History Gateway backed by the user transactions gRPC service

use crate::config::HistoryConfig;
use crate::error::{Result, ServiceError};
use crate::proto::user_transactions_service_client::UserTransactionsServiceClient;
use crate::proto::{
    LastUserTransactionRequest, LastUserTransactionResponse, UserMonthAverageRequest,
    UserMonthAverageResponse,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scoring_core::{AveragePayment, GatewayError, HistoryGateway, LastOrder};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::debug;

/// gRPC History Gateway
#[derive(Debug, Clone)]
pub struct GrpcHistoryGateway {
    client: UserTransactionsServiceClient<Channel>,
    request_timeout: Duration,
}

impl GrpcHistoryGateway {
    /// Build a lazily connected client; the first call opens the channel
    pub fn connect(config: &HistoryConfig) -> Result<Self> {
        let endpoint = Endpoint::from_shared(config.endpoint_uri())
            .map_err(|e| ServiceError::Grpc(format!("invalid endpoint {}: {}", config.endpoint, e)))?
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        Ok(Self {
            client: UserTransactionsServiceClient::new(endpoint.connect_lazy()),
            request_timeout: config.request_timeout(),
        })
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        request.set_timeout(self.request_timeout);
        request
    }
}

#[async_trait]
impl HistoryGateway for GrpcHistoryGateway {
    async fn last_order(&self, buyer_document: &str) -> std::result::Result<LastOrder, GatewayError> {
        debug!(buyer_document, "Fetching last user transaction");

        let request = self.request(LastUserTransactionRequest {
            document: buyer_document.to_string(),
        });

        let response = self
            .client
            .clone()
            .get_last_user_transaction(request)
            .await
            .map_err(map_status)?;

        last_order_from(response.into_inner())
    }

    async fn average_transactions(
        &self,
        buyer_document: &str,
        reference_time: DateTime<Utc>,
    ) -> std::result::Result<AveragePayment, GatewayError> {
        let month = billing_month(reference_time);
        debug!(buyer_document, month = %month, "Fetching user month average");

        let request = self.request(UserMonthAverageRequest {
            document: buyer_document.to_string(),
            month,
        });

        let response = self
            .client
            .clone()
            .get_user_month_average(request)
            .await
            .map_err(map_status)?;

        average_from(response.into_inner())
    }
}

/// Billing period sent to the history service (`YYYY-MM`)
pub fn billing_month(reference_time: DateTime<Utc>) -> String {
    reference_time.format("%Y-%m").to_string()
}

/// Map a gRPC status onto the gateway taxonomy
pub fn map_status(status: Status) -> GatewayError {
    match status.code() {
        Code::NotFound => GatewayError::NotFound(status.message().to_string()),
        code => GatewayError::Transport(format!("{:?}: {}", code, status.message())),
    }
}

/// Convert a last transaction response
pub fn last_order_from(response: LastUserTransactionResponse) -> std::result::Result<LastOrder, GatewayError> {
    let amount = scoring_core::parse_amount(&response.value)
        .map_err(|e| GatewayError::InvalidResponse(format!("last transaction value: {}", e)))?;

    Ok(LastOrder {
        seller_id: response.seller_id,
        currency: response.currency,
        amount,
    })
}

/// Convert a month average response
pub fn average_from(response: UserMonthAverageResponse) -> std::result::Result<AveragePayment, GatewayError> {
    let amount = scoring_core::parse_amount(&response.total)
        .map_err(|e| GatewayError::InvalidResponse(format!("month average total: {}", e)))?;

    Ok(AveragePayment {
        month: response.month,
        amount,
    })
}
