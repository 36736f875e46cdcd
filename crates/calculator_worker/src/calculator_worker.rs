use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tollgate_domain::{AggregatorClient, DistanceCalculator};
use tollgate_nats::{JetStreamConsumer, NatsConsumer};

use crate::forwarder::{DistanceForwarder, RetryPolicy};
use crate::processor::create_telemetry_processor;

pub struct CalculatorWorkerConfig {
    pub stream: String,
    pub consumer_name: String,
    pub subject_filter: String,
    pub batch_size: usize,
    pub batch_wait_secs: u64,
    /// Number of parallel consumer loops. Each loop processes its share of
    /// the stream sequentially; loops run in parallel across shards.
    pub worker_count: usize,
}

/// The consume → calculate → forward worker.
///
/// All loops share one durable consumer, one calculator (so per-unit state
/// is not split across loops) and one retrying forwarder.
pub struct CalculatorWorker {
    consumers: Vec<NatsConsumer>,
}

impl CalculatorWorker {
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        calculator: Arc<dyn DistanceCalculator>,
        client: Arc<dyn AggregatorClient>,
        retry_policy: RetryPolicy,
        config: CalculatorWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!(
            stream = %config.stream,
            worker_count = config.worker_count,
            "initializing calculator worker"
        );

        let forwarder = Arc::new(DistanceForwarder::new(client, retry_policy));

        let mut consumers = Vec::new();
        for _ in 0..config.worker_count.max(1) {
            let processor =
                create_telemetry_processor(Arc::clone(&calculator), Arc::clone(&forwarder));
            let consumer = NatsConsumer::new(
                Arc::clone(&jetstream),
                &config.stream,
                &config.consumer_name,
                &config.subject_filter,
                config.batch_size,
                config.batch_wait_secs,
                processor,
            )
            .await?;
            consumers.push(consumer);
        }

        info!("calculator worker initialized");

        Ok(Self { consumers })
    }

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
        self.consumers
            .into_iter()
            .map(|consumer| {
                let process: Box<
                    dyn FnOnce(
                            CancellationToken,
                        ) -> Pin<
                            Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
                        > + Send,
                > = Box::new(move |ctx| Box::pin(async move { consumer.run(ctx).await }));
                process
            })
            .collect()
    }
}
