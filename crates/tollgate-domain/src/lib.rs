pub mod calculator;
pub mod client;
pub mod error;
pub mod in_memory_invoice_store;
pub mod invoice_service;
pub mod invoice_store;
pub mod middleware;
pub mod types;

pub use calculator::*;
pub use client::*;
pub use error::{ClientError, ClientResult, DomainError, DomainResult};
pub use in_memory_invoice_store::*;
pub use invoice_service::*;
pub use invoice_store::*;
pub use middleware::*;
pub use types::*;
