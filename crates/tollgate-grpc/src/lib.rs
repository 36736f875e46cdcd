pub mod client;
pub mod error;
pub mod handler;
pub mod server;

pub use client::GrpcAggregatorClient;
pub use error::domain_error_to_status;
pub use handler::AggregatorHandler;
pub use server::{run_grpc_server, GrpcServerConfig};
