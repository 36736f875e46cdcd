//! Aggregator service module: one engine exposed over both wire protocols.

use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use tollgate_domain::InvoiceAggregator;
use tollgate_grpc::{run_grpc_server, GrpcServerConfig};
use tollgate_http::{run_http_server, HttpServerConfig};

pub struct AggregatorApi {
    grpc_config: GrpcServerConfig,
    http_config: HttpServerConfig,
    aggregator: Arc<dyn InvoiceAggregator>,
}

impl AggregatorApi {
    pub fn new(
        grpc_config: GrpcServerConfig,
        http_config: HttpServerConfig,
        aggregator: Arc<dyn InvoiceAggregator>,
    ) -> Self {
        debug!("initializing aggregator API module");
        Self {
            grpc_config,
            http_config,
            aggregator,
        }
    }

    /// One runner process per transport; both serve the same engine.
    pub fn into_runner_processes(
        self,
    ) -> Vec<
        Box<
            dyn FnOnce(
                    CancellationToken,
                )
                    -> Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>>
                + Send,
        >,
    > {
        let grpc_config = self.grpc_config;
        let http_config = self.http_config;
        let grpc_aggregator = Arc::clone(&self.aggregator);
        let http_aggregator = self.aggregator;

        vec![
            Box::new(move |ctx| {
                Box::pin(async move { run_grpc_server(grpc_config, grpc_aggregator, ctx).await })
            }),
            Box::new(move |ctx| {
                Box::pin(async move { run_http_server(http_config, http_aggregator, ctx).await })
            }),
        ]
    }
}
