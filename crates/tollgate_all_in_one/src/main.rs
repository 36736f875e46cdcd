mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use calculator_worker::{CalculatorWorker, CalculatorWorkerConfig, RetryPolicy};
use config::ServiceConfig;
use invoice_aggregator::AggregatorApi;
use tollgate_domain::{
    AggregatorClient, DistanceCalculator, InMemoryInvoiceStore, InvoiceService, LoggingAggregator,
    LoggingCalculator, ObuDistanceCalculator, PricingModel,
};
use tollgate_grpc::{GrpcAggregatorClient, GrpcServerConfig};
use tollgate_http::{HttpAggregatorClient, HttpServerConfig};
use tollgate_nats::{run_demo_producer, DemoProducerConfig, NatsClient, TelemetryProducer};
use tollgate_runner::Runner;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    telemetry::init_telemetry(&config.log_level);

    info!(
        transport = %config.aggregator_transport,
        stream = %config.telemetry_stream,
        "starting tollgate-all-in-one"
    );

    // Shared NATS connection for the worker and the demo producer.
    let nats_client = match initialize_nats(&config).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to initialize NATS");
            std::process::exit(1);
        }
    };

    // Aggregation engine over the in-memory store, with logging middleware
    // wrapped around the engine contract.
    let store = Arc::new(InMemoryInvoiceStore::new());
    let pricing = PricingModel::new(config.pricing_rate);
    let aggregator = Arc::new(LoggingAggregator::new(InvoiceService::new(store, pricing)));

    let aggregator_api = AggregatorApi::new(
        GrpcServerConfig {
            host: config.grpc_host.clone(),
            port: config.grpc_port,
        },
        HttpServerConfig {
            host: config.http_host.clone(),
            port: config.http_port,
        },
        aggregator,
    );

    // Transport client for the worker; which protocol carries the distance
    // is purely a deployment choice.
    let client = match build_aggregator_client(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build aggregator client");
            std::process::exit(1);
        }
    };

    let calculator: Arc<dyn DistanceCalculator> =
        Arc::new(LoggingCalculator::new(ObuDistanceCalculator::new()));

    let retry_policy = RetryPolicy {
        max_attempts: config.retry_max_attempts,
        base_delay: Duration::from_millis(config.retry_base_delay_ms),
        max_delay: Duration::from_millis(config.retry_max_delay_ms),
    };

    let worker = match CalculatorWorker::new(
        nats_client.create_consumer_client(),
        calculator,
        client,
        retry_policy,
        CalculatorWorkerConfig {
            stream: config.telemetry_stream.clone(),
            consumer_name: config.consumer_name.clone(),
            subject_filter: config.telemetry_subject.clone(),
            batch_size: config.nats_batch_size,
            batch_wait_secs: config.nats_batch_wait_secs,
            worker_count: config.worker_count,
        },
    )
    .await
    {
        Ok(worker) => worker,
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to initialize calculator worker");
            std::process::exit(1);
        }
    };

    let mut runner = Runner::new();

    for (i, process) in aggregator_api.into_runner_processes().into_iter().enumerate() {
        runner = runner.with_named_process(format!("aggregator_api_{i}"), process);
    }

    for (i, process) in worker.into_runner_processes().into_iter().enumerate() {
        runner = runner.with_named_process(format!("calculator_worker_{i}"), process);
    }

    if config.demo_producer_enabled {
        let producer = TelemetryProducer::new(
            nats_client.create_publisher_client(),
            config.telemetry_stream.clone(),
        );
        let demo_config = DemoProducerConfig {
            interval: Duration::from_millis(config.demo_interval_ms),
            fleet_size: config.demo_fleet_size,
            max_step: 25.0,
        };
        runner = runner.with_named_process("demo_producer", move |ctx| async move {
            run_demo_producer(ctx, demo_config, producer).await
        });
    }

    runner = runner
        .with_closer({
            let nats_for_close = Arc::clone(&nats_client);
            move || {
                Box::pin(async move {
                    info!("running cleanup tasks");
                    if let Ok(client) = Arc::try_unwrap(nats_for_close) {
                        client.close().await;
                    }
                    info!("cleanup complete");
                    Ok(())
                })
            }
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}

async fn initialize_nats(config: &ServiceConfig) -> anyhow::Result<NatsClient> {
    let nats_client = NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.startup_timeout_secs),
    )
    .await?;
    nats_client.ensure_stream(&config.telemetry_stream).await?;
    Ok(nats_client)
}

fn build_aggregator_client(
    config: &ServiceConfig,
) -> Result<Arc<dyn AggregatorClient>, anyhow::Error> {
    let timeout = Duration::from_secs(config.client_timeout_secs);

    let client: Arc<dyn AggregatorClient> = match config.aggregator_transport.as_str() {
        "http" => Arc::new(
            HttpAggregatorClient::new(&config.http_endpoint, timeout)
                .map_err(|e| anyhow::anyhow!("http client: {e}"))?,
        ),
        "grpc" => Arc::new(
            GrpcAggregatorClient::new(&config.grpc_endpoint, timeout)
                .map_err(|e| anyhow::anyhow!("grpc client: {e}"))?,
        ),
        other => anyhow::bail!("unknown aggregator transport {other:?} (expected grpc or http)"),
    };

    Ok(client)
}
