use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use tollgate_domain::InvoiceAggregator;
use tollgate_proto::conversions::{aggregate_request_to_distance, invoice_to_proto};
use tollgate_proto::tollgate::v1::aggregator_server::Aggregator;
use tollgate_proto::tollgate::v1::{
    AggregateRequest, AggregateResponse, GetInvoiceRequest, GetInvoiceResponse,
};

use crate::error::domain_error_to_status;

/// gRPC handler for the aggregator service.
/// Handles wire → domain mapping and error conversion; business logic stays
/// behind the [`InvoiceAggregator`] contract.
pub struct AggregatorHandler {
    aggregator: Arc<dyn InvoiceAggregator>,
}

impl AggregatorHandler {
    pub fn new(aggregator: Arc<dyn InvoiceAggregator>) -> Self {
        Self { aggregator }
    }
}

#[tonic::async_trait]
impl Aggregator for AggregatorHandler {
    async fn aggregate(
        &self,
        request: Request<AggregateRequest>,
    ) -> Result<Response<AggregateResponse>, Status> {
        let req = request.into_inner();

        debug!(
            obu_id = req.obu_id,
            value = req.value,
            "received Aggregate request"
        );

        let distance = aggregate_request_to_distance(req);

        self.aggregator
            .aggregate_distance(distance)
            .await
            .map_err(domain_error_to_status)?;

        Ok(Response::new(AggregateResponse {}))
    }

    async fn get_invoice(
        &self,
        request: Request<GetInvoiceRequest>,
    ) -> Result<Response<GetInvoiceResponse>, Status> {
        let req = request.into_inner();

        debug!(obu_id = req.obu_id, "received GetInvoice request");

        let invoice = self
            .aggregator
            .get_invoice(req.obu_id)
            .await
            .map_err(domain_error_to_status)?;

        Ok(Response::new(GetInvoiceResponse {
            invoice: Some(invoice_to_proto(&invoice)),
        }))
    }
}
