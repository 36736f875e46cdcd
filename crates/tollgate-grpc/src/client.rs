use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use tollgate_domain::{AggregatorClient, ClientError, ClientResult, Distance, Invoice};
use tollgate_proto::conversions::{distance_to_aggregate_request, proto_to_invoice};
use tollgate_proto::tollgate::v1::aggregator_client::AggregatorClient as ProtoAggregatorClient;
use tollgate_proto::tollgate::v1::GetInvoiceRequest;

/// gRPC adapter for the [`AggregatorClient`] contract.
///
/// Dials lazily: the channel connects on first use and reconnects as needed,
/// and is released when the client drops. Each call is bounded by the
/// configured timeout.
pub struct GrpcAggregatorClient {
    inner: ProtoAggregatorClient<Channel>,
}

impl GrpcAggregatorClient {
    pub fn new(endpoint: &str, timeout: Duration) -> ClientResult<Self> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| ClientError::Transport(e.into()))?
            .timeout(timeout)
            .connect_lazy();

        Ok(Self {
            inner: ProtoAggregatorClient::new(channel),
        })
    }
}

#[async_trait]
impl AggregatorClient for GrpcAggregatorClient {
    async fn aggregate(&self, distance: Distance) -> ClientResult<()> {
        // Cloning the generated client reuses the underlying channel.
        let mut client = self.inner.clone();
        let request = distance_to_aggregate_request(&distance);

        client
            .aggregate(request)
            .await
            .map(|_| ())
            .map_err(|status| status_to_client_error(status, distance.unit_id))
    }

    async fn get_invoice(&self, unit_id: i64) -> ClientResult<Invoice> {
        let mut client = self.inner.clone();

        let response = client
            .get_invoice(GetInvoiceRequest { obu_id: unit_id })
            .await
            .map_err(|status| status_to_client_error(status, unit_id))?;

        let invoice = response
            .into_inner()
            .invoice
            .ok_or_else(|| ClientError::Transport(anyhow::anyhow!("empty invoice response")))?;

        Ok(proto_to_invoice(invoice))
    }
}

fn status_to_client_error(status: Status, unit_id: i64) -> ClientError {
    match status.code() {
        Code::NotFound => ClientError::NotFound(unit_id),
        // Delivery-level failures; the request may not have reached the
        // engine, so these are the retryable class.
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Unknown => {
            ClientError::Transport(anyhow::anyhow!(status))
        }
        _ => ClientError::Rejected(status.message().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_maps_to_not_found() {
        let error = status_to_client_error(Status::not_found("no invoice"), 7);
        assert!(matches!(error, ClientError::NotFound(7)));
    }

    #[test]
    fn unavailable_status_is_transient() {
        let error = status_to_client_error(Status::unavailable("connection refused"), 1);
        assert!(error.is_transient());
    }

    #[test]
    fn invalid_argument_status_is_terminal() {
        let error = status_to_client_error(Status::invalid_argument("bad value"), 1);
        assert!(matches!(error, ClientError::Rejected(_)));
        assert!(!error.is_transient());
    }

    #[test]
    fn internal_status_is_terminal() {
        let error = status_to_client_error(Status::internal("store error"), 1);
        assert!(matches!(error, ClientError::Rejected(_)));
    }
}
