use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::{error, info};

use tollgate_domain::InvoiceAggregator;
use tollgate_proto::tollgate::v1::aggregator_server::AggregatorServer;

use crate::handler::AggregatorHandler;

/// gRPC server configuration.
#[derive(Debug, Clone)]
pub struct GrpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
        }
    }
}

/// Run the gRPC server with graceful shutdown.
pub async fn run_grpc_server(
    config: GrpcServerConfig,
    aggregator: Arc<dyn InvoiceAggregator>,
    cancellation_token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid gRPC server address")?;

    info!(address = %addr, "starting gRPC server");

    let handler = AggregatorHandler::new(aggregator);

    let server = Server::builder()
        .add_service(AggregatorServer::new(handler))
        .serve_with_shutdown(addr, async move {
            cancellation_token.cancelled().await;
            info!("gRPC server shutdown signal received");
        });

    match server.await {
        Ok(_) => {
            info!("gRPC server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "gRPC server error");
            Err(e.into())
        }
    }
}
