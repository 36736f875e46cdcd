pub mod calculator_worker;
pub mod forwarder;
pub mod processor;

pub use calculator_worker::{CalculatorWorker, CalculatorWorkerConfig};
pub use forwarder::{DistanceForwarder, RetryPolicy};
pub use processor::create_telemetry_processor;
