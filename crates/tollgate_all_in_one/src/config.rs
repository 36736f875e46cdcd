use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// JetStream stream name for OBU telemetry
    #[serde(default = "default_telemetry_stream")]
    pub telemetry_stream: String,

    /// Subject filter for the calculator worker's consumer
    #[serde(default = "default_telemetry_subject")]
    pub telemetry_subject: String,

    /// Durable consumer name for the calculator worker
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Batch size for the consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Number of parallel consumer loops
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Aggregator server configuration
    /// gRPC server host
    #[serde(default = "default_grpc_host")]
    pub grpc_host: String,

    /// gRPC server port
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // Transport client configuration
    /// Transport the calculator worker uses to reach the aggregator
    /// ("grpc" or "http"); a deployment choice, never a behavioral one
    #[serde(default = "default_aggregator_transport")]
    pub aggregator_transport: String,

    /// Aggregator gRPC endpoint
    #[serde(default = "default_grpc_endpoint")]
    pub grpc_endpoint: String,

    /// Aggregator HTTP endpoint
    #[serde(default = "default_http_endpoint")]
    pub http_endpoint: String,

    /// Per-call client timeout in seconds
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,

    // Retry configuration
    /// Transport retry ceiling, including the first attempt
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base backoff delay in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,

    // Pricing configuration
    /// Price per canonical distance unit
    #[serde(default = "default_pricing_rate")]
    pub pricing_rate: f64,

    // Demo producer configuration
    /// Publish simulated OBU readings alongside the pipeline
    #[serde(default = "default_demo_producer_enabled")]
    pub demo_producer_enabled: bool,

    /// Interval between demo emission rounds in milliseconds
    #[serde(default = "default_demo_interval_ms")]
    pub demo_interval_ms: u64,

    /// Number of simulated units
    #[serde(default = "default_demo_fleet_size")]
    pub demo_fleet_size: i64,
}

fn default_log_level() -> String {
    "info".to_string()
}

// NATS defaults
fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_telemetry_stream() -> String {
    "obu_telemetry".to_string()
}

fn default_telemetry_subject() -> String {
    "obu_telemetry.>".to_string()
}

fn default_consumer_name() -> String {
    "calculator-worker".to_string()
}

fn default_nats_batch_size() -> usize {
    30
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_worker_count() -> usize {
    2
}

fn default_startup_timeout_secs() -> u64 {
    30
}

// Server defaults
fn default_grpc_host() -> String {
    "0.0.0.0".to_string()
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    3000
}

// Client defaults
fn default_aggregator_transport() -> String {
    "grpc".to_string()
}

fn default_grpc_endpoint() -> String {
    "http://127.0.0.1:50051".to_string()
}

fn default_http_endpoint() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_client_timeout_secs() -> u64 {
    5
}

// Retry defaults
fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

// Pricing defaults
fn default_pricing_rate() -> f64 {
    3.15
}

// Demo producer defaults
fn default_demo_producer_enabled() -> bool {
    false
}

fn default_demo_interval_ms() -> u64 {
    1000
}

fn default_demo_fleet_size() -> i64 {
    3
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("TOLLGATE"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests mutate process environment; serialize them.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn default_config_loads() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("TOLLGATE_LOG_LEVEL");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.telemetry_stream, "obu_telemetry");
        assert_eq!(config.aggregator_transport, "grpc");
        assert_eq!(config.retry_max_attempts, 3);
    }

    #[test]
    fn environment_overrides_defaults() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("TOLLGATE_AGGREGATOR_TRANSPORT", "http");
        std::env::set_var("TOLLGATE_RETRY_MAX_ATTEMPTS", "5");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.aggregator_transport, "http");
        assert_eq!(config.retry_max_attempts, 5);

        std::env::remove_var("TOLLGATE_AGGREGATOR_TRANSPORT");
        std::env::remove_var("TOLLGATE_RETRY_MAX_ATTEMPTS");
    }
}
