use tollgate_domain::{
    Distance, DomainError, DomainResult, Invoice, Reading, TelemetrySample,
};

use crate::tollgate::v1 as proto;

/// Convert a wire-level aggregate request to the canonical distance.
pub fn aggregate_request_to_distance(request: proto::AggregateRequest) -> Distance {
    Distance {
        unit_id: request.obu_id,
        value: request.value,
        unix: request.unix,
    }
}

pub fn distance_to_aggregate_request(distance: &Distance) -> proto::AggregateRequest {
    proto::AggregateRequest {
        obu_id: distance.unit_id,
        value: distance.value,
        unix: distance.unix,
    }
}

pub fn invoice_to_proto(invoice: &Invoice) -> proto::Invoice {
    proto::Invoice {
        obu_id: invoice.unit_id,
        total_distance: invoice.total_distance,
        amount: invoice.amount,
    }
}

pub fn proto_to_invoice(invoice: proto::Invoice) -> Invoice {
    Invoice {
        unit_id: invoice.obu_id,
        total_distance: invoice.total_distance,
        amount: invoice.amount,
    }
}

/// Convert a decoded telemetry event to the domain sample. Fails when the
/// event carries no reading.
pub fn telemetry_event_to_sample(event: proto::TelemetryEvent) -> DomainResult<TelemetrySample> {
    let reading = match event.reading {
        Some(proto::telemetry_event::Reading::Position(position)) => Reading::Position {
            x: position.x,
            y: position.y,
        },
        Some(proto::telemetry_event::Reading::Travelled(value)) => Reading::Travelled(value),
        None => {
            return Err(DomainError::DecodeError(format!(
                "telemetry event for unit {} carries no reading",
                event.obu_id
            )))
        }
    };

    Ok(TelemetrySample {
        unit_id: event.obu_id,
        reading,
        unix: event.unix,
    })
}

pub fn sample_to_telemetry_event(sample: &TelemetrySample) -> proto::TelemetryEvent {
    let reading = match sample.reading {
        Reading::Position { x, y } => {
            proto::telemetry_event::Reading::Position(proto::Position { x, y })
        }
        Reading::Travelled(value) => proto::telemetry_event::Reading::Travelled(value),
    };

    proto::TelemetryEvent {
        obu_id: sample.unit_id,
        unix: sample.unix,
        reading: Some(reading),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_request_maps_field_for_field() {
        let request = proto::AggregateRequest {
            obu_id: 42,
            value: 10.5,
            unix: 1700000000,
        };

        let distance = aggregate_request_to_distance(request);
        assert_eq!(distance.unit_id, 42);
        assert_eq!(distance.value, 10.5);
        assert_eq!(distance.unix, 1700000000);
    }

    #[test]
    fn distance_round_trips_through_the_wire_shape() {
        let distance = Distance {
            unit_id: 7,
            value: 3.25,
            unix: 1700000001,
        };

        let back = aggregate_request_to_distance(distance_to_aggregate_request(&distance));
        assert_eq!(back, distance);
    }

    #[test]
    fn telemetry_event_with_position_converts() {
        let event = proto::TelemetryEvent {
            obu_id: 1,
            unix: 100,
            reading: Some(proto::telemetry_event::Reading::Position(proto::Position {
                x: 3.0,
                y: 4.0,
            })),
        };

        let sample = telemetry_event_to_sample(event).unwrap();
        assert_eq!(sample.reading, Reading::Position { x: 3.0, y: 4.0 });
    }

    #[test]
    fn telemetry_event_with_scalar_converts() {
        let event = proto::TelemetryEvent {
            obu_id: 1,
            unix: 100,
            reading: Some(proto::telemetry_event::Reading::Travelled(9.5)),
        };

        let sample = telemetry_event_to_sample(event).unwrap();
        assert_eq!(sample.reading, Reading::Travelled(9.5));
    }

    #[test]
    fn telemetry_event_without_reading_is_a_decode_error() {
        let event = proto::TelemetryEvent {
            obu_id: 1,
            unix: 100,
            reading: None,
        };

        assert!(matches!(
            telemetry_event_to_sample(event),
            Err(DomainError::DecodeError(_))
        ));
    }

    #[test]
    fn invoice_maps_in_both_directions() {
        let invoice = Invoice {
            unit_id: 42,
            total_distance: 15.5,
            amount: 48.825,
        };

        let back = proto_to_invoice(invoice_to_proto(&invoice));
        assert_eq!(back, invoice);
    }
}
