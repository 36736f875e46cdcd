use std::sync::Arc;

use anyhow::Result;
use prost::Message;
use tracing::debug;

use tollgate_domain::TelemetrySample;
use tollgate_proto::conversions::sample_to_telemetry_event;

use crate::traits::JetStreamPublisher;

/// Publishes telemetry samples onto the event stream as protobuf
/// `TelemetryEvent` payloads, one subject per unit.
pub struct TelemetryProducer {
    publisher: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl TelemetryProducer {
    pub fn new(publisher: Arc<dyn JetStreamPublisher>, base_subject: String) -> Self {
        debug!(base_subject = %base_subject, "initialized telemetry producer");
        Self {
            publisher,
            base_subject,
        }
    }

    pub async fn publish_sample(&self, sample: &TelemetrySample) -> Result<()> {
        let event = sample_to_telemetry_event(sample);
        let payload = event.encode_to_vec();
        let subject = format!("{}.{}", self.base_subject, sample.unit_id);

        self.publisher.publish(subject, payload.into()).await
    }
}
