use std::sync::Arc;

use async_nats::jetstream::Message;
use prost::Message as ProstMessage;
use tracing::{debug, error, warn};

use tollgate_domain::{ClientError, DistanceCalculator, DomainError};
use tollgate_nats::{BatchProcessor, ProcessingResult};
use tollgate_proto::conversions::telemetry_event_to_sample;
use tollgate_proto::tollgate::v1::TelemetryEvent;

use crate::forwarder::DistanceForwarder;

/// What happened to one telemetry event.
///
/// Every disposition acks the message: a forwarded event is committed work,
/// and a skipped or dropped event must not block the shard. Redelivery only
/// happens when the worker dies before acking.
#[derive(Debug)]
pub(crate) enum EventDisposition {
    Forwarded,
    SkippedDecode(String),
    SkippedInvalidSample(String),
    SkippedRejected(String),
    DroppedAfterRetry(String),
}

pub(crate) async fn process_event(
    payload: &[u8],
    calculator: &dyn DistanceCalculator,
    forwarder: &DistanceForwarder,
) -> EventDisposition {
    let event = match TelemetryEvent::decode(payload) {
        Ok(event) => event,
        Err(e) => return EventDisposition::SkippedDecode(e.to_string()),
    };

    let sample = match telemetry_event_to_sample(event) {
        Ok(sample) => sample,
        Err(e) => return EventDisposition::SkippedDecode(e.to_string()),
    };

    let distance = match calculator.calculate(&sample) {
        Ok(distance) => distance,
        Err(DomainError::InvalidSample(msg)) => {
            return EventDisposition::SkippedInvalidSample(msg)
        }
        Err(e) => return EventDisposition::SkippedInvalidSample(e.to_string()),
    };

    match forwarder.forward(distance).await {
        Ok(()) => EventDisposition::Forwarded,
        Err(ClientError::Transport(e)) => EventDisposition::DroppedAfterRetry(e.to_string()),
        Err(e) => EventDisposition::SkippedRejected(e.to_string()),
    }
}

/// Build the batch processor driving decode → calculate → forward for each
/// fetched telemetry event.
pub fn create_telemetry_processor(
    calculator: Arc<dyn DistanceCalculator>,
    forwarder: Arc<DistanceForwarder>,
) -> BatchProcessor {
    Box::new(move |messages: &[Message]| {
        let calculator = Arc::clone(&calculator);
        let forwarder = Arc::clone(&forwarder);

        // Copy payloads out before the async block; Message borrows from
        // the slice.
        let message_data: Vec<(usize, Vec<u8>, String)> = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| (idx, msg.payload.to_vec(), msg.subject.to_string()))
            .collect();

        Box::pin(async move {
            let mut ack = Vec::new();

            for (idx, payload, subject) in message_data {
                match process_event(&payload, calculator.as_ref(), forwarder.as_ref()).await {
                    EventDisposition::Forwarded => {
                        debug!(index = idx, subject = %subject, "forwarded telemetry event");
                    }
                    EventDisposition::SkippedDecode(reason) => {
                        warn!(
                            index = idx,
                            subject = %subject,
                            reason = %reason,
                            "skipping malformed telemetry event"
                        );
                    }
                    EventDisposition::SkippedInvalidSample(reason) => {
                        warn!(
                            index = idx,
                            subject = %subject,
                            reason = %reason,
                            "skipping invalid telemetry sample"
                        );
                    }
                    EventDisposition::SkippedRejected(reason) => {
                        warn!(
                            index = idx,
                            subject = %subject,
                            reason = %reason,
                            "aggregator rejected distance, skipping event"
                        );
                    }
                    EventDisposition::DroppedAfterRetry(reason) => {
                        error!(
                            index = idx,
                            subject = %subject,
                            reason = %reason,
                            "dropping telemetry event after exhausting transport retries"
                        );
                    }
                }
                // Always advance past the event; see EventDisposition.
                ack.push(idx);
            }

            Ok(ProcessingResult {
                ack,
                nak: Vec::new(),
            })
        })
    })
}
