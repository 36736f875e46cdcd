use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_nats::jetstream::{self, Message};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::traits::{JetStreamConsumer, PullConsumer};

/// Outcome of processing one fetched batch.
///
/// Acked messages advance the consumer's committed position; naked messages
/// are redelivered. Skipping a poisoned message is expressed by acking it
/// after logging, so one bad event never blocks the shard.
#[derive(Debug)]
pub struct ProcessingResult {
    /// Indices of messages to acknowledge.
    pub ack: Vec<usize>,
    /// Indices of messages to reject for redelivery, with error details.
    pub nak: Vec<(usize, Option<String>)>,
}

impl ProcessingResult {
    pub fn ack_all(count: usize) -> Self {
        Self {
            ack: (0..count).collect(),
            nak: Vec::new(),
        }
    }

    pub fn nak_all(count: usize, error: Option<String>) -> Self {
        Self {
            ack: Vec::new(),
            nak: (0..count).map(|i| (i, error.clone())).collect(),
        }
    }
}

/// Batch processor supplied by the worker owning the business logic.
/// The processor is responsible for decoding and processing the messages.
pub type BatchProcessor =
    Box<dyn Fn(&[Message]) -> BoxFuture<'static, Result<ProcessingResult>> + Send + Sync>;

/// Generic JetStream pull-consumer loop.
///
/// Fetches batches from a durable consumer, hands them to the processor and
/// applies the resulting acknowledgments. Deserialization and business logic
/// live entirely in the processor.
pub struct NatsConsumer {
    consumer: Box<dyn PullConsumer>,
    stream_name: String,
    consumer_name: String,
    batch_size: usize,
    max_wait: Duration,
    processor: BatchProcessor,
}

impl NatsConsumer {
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        processor: BatchProcessor,
    ) -> Result<Self> {
        debug!(
            stream = %stream_name,
            consumer = %consumer_name,
            filter_subject = %subject_filter,
            "creating JetStream consumer"
        );

        let config = jetstream::consumer::pull::Config {
            name: Some(consumer_name.to_string()),
            durable_name: Some(consumer_name.to_string()),
            filter_subject: subject_filter.to_string(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ..Default::default()
        };

        let consumer = jetstream
            .create_consumer(config, stream_name)
            .await
            .context("failed to create consumer")?;

        info!(
            stream = %stream_name,
            consumer = %consumer_name,
            "consumer created"
        );

        Ok(Self {
            consumer,
            stream_name: stream_name.to_string(),
            consumer_name: consumer_name.to_string(),
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            processor,
        })
    }

    /// Poll-process-commit loop. Stops promptly on cancellation; progress
    /// acked before the signal stays committed.
    pub async fn run(self, ctx: CancellationToken) -> Result<()> {
        info!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "starting consumer loop"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        stream = %self.stream_name,
                        consumer = %self.consumer_name,
                        "received shutdown signal, stopping consumer"
                    );
                    break;
                }
                result = self.fetch_and_process_batch() => {
                    if let Err(e) = result {
                        error!(
                            stream = %self.stream_name,
                            error = %e,
                            "error processing batch"
                        );
                        // Keep the loop alive; the batch will be redelivered.
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!(
            stream = %self.stream_name,
            consumer = %self.consumer_name,
            "consumer stopped gracefully"
        );
        Ok(())
    }

    async fn fetch_and_process_batch(&self) -> Result<()> {
        let raw_messages = self
            .consumer
            .fetch_messages(self.batch_size, self.max_wait)
            .await?;

        if raw_messages.is_empty() {
            debug!("no messages in batch");
            return Ok(());
        }

        debug!(message_count = raw_messages.len(), "received message batch");

        let processing_result = match (self.processor)(&raw_messages).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "processor returned error, rejecting all messages");
                ProcessingResult::nak_all(raw_messages.len(), Some(e.to_string()))
            }
        };

        for idx in processing_result.ack {
            match raw_messages.get(idx) {
                Some(msg) => {
                    if let Err(e) = msg.ack().await {
                        error!(error = %e, message_index = idx, "failed to acknowledge message");
                    }
                }
                None => warn!(message_index = idx, "invalid ack index in processing result"),
            }
        }

        for (idx, error_msg) in processing_result.nak {
            match raw_messages.get(idx) {
                Some(msg) => {
                    warn!(
                        message_index = idx,
                        subject = %msg.subject,
                        error = error_msg.as_deref().unwrap_or("unspecified"),
                        "rejecting message for redelivery"
                    );
                    if let Err(e) = msg.ack_with(jetstream::AckKind::Nak(None)).await {
                        error!(error = %e, message_index = idx, "failed to reject message");
                    }
                }
                None => warn!(message_index = idx, "invalid nak index in processing result"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockJetStreamConsumer, MockPullConsumer};

    #[tokio::test]
    async fn consumer_creation_uses_durable_config() {
        let mut jetstream = MockJetStreamConsumer::new();

        jetstream
            .expect_create_consumer()
            .withf(
                |config: &jetstream::consumer::pull::Config, stream_name: &str| {
                    config.durable_name.as_deref() == Some("calculator-worker")
                        && config.filter_subject == "obu_telemetry.>"
                        && stream_name == "obu_telemetry"
                },
            )
            .times(1)
            .returning(|_, _| Ok(Box::new(MockPullConsumer::new())));

        let processor: BatchProcessor =
            Box::new(|messages| {
                let count = messages.len();
                Box::pin(async move { Ok(ProcessingResult::ack_all(count)) })
            });

        let result = NatsConsumer::new(
            Arc::new(jetstream),
            "obu_telemetry",
            "calculator-worker",
            "obu_telemetry.>",
            10,
            5,
            processor,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn consumer_creation_failure_is_propagated() {
        let mut jetstream = MockJetStreamConsumer::new();
        jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("stream not found")));

        let processor: BatchProcessor =
            Box::new(|_| Box::pin(async move { Ok(ProcessingResult::ack_all(0)) }));

        let result = NatsConsumer::new(
            Arc::new(jetstream),
            "obu_telemetry",
            "calculator-worker",
            "obu_telemetry.>",
            10,
            5,
            processor,
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let mut jetstream = MockJetStreamConsumer::new();
        jetstream.expect_create_consumer().times(1).returning(|_, _| {
            let mut consumer = MockPullConsumer::new();
            consumer
                .expect_fetch_messages()
                .times(1)
                .returning(|_, _| Ok(vec![]));
            Ok(Box::new(consumer))
        });

        let processor: BatchProcessor =
            Box::new(|_| Box::pin(async move { panic!("processor must not run on empty batch") }));

        let consumer = NatsConsumer::new(
            Arc::new(jetstream),
            "obu_telemetry",
            "calculator-worker",
            "obu_telemetry.>",
            10,
            5,
            processor,
        )
        .await
        .unwrap();

        assert!(consumer.fetch_and_process_batch().await.is_ok());
    }
}
