pub mod client;
pub mod server;
pub mod types;

pub use client::HttpAggregatorClient;
pub use server::{build_router, run_http_server, HttpServerConfig};
pub use types::{AggregateBody, InvoiceBody};
