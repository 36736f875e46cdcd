use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use crate::calculator::DistanceCalculator;
use crate::error::DomainResult;
use crate::invoice_service::InvoiceAggregator;
use crate::types::{Distance, Invoice, TelemetrySample};

/// Logging decorator for the calculator contract. Forwards every call
/// unchanged and records the operation, an input summary, the duration and
/// the error, if any. Layers compose: a decorator wraps anything that
/// implements the contract, including another decorator.
pub struct LoggingCalculator<C> {
    inner: C,
}

impl<C: DistanceCalculator> LoggingCalculator<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: DistanceCalculator> DistanceCalculator for LoggingCalculator<C> {
    fn calculate(&self, sample: &TelemetrySample) -> DomainResult<Distance> {
        let start = Instant::now();
        let result = self.inner.calculate(sample);
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(distance) => info!(
                operation = "calculate",
                unit_id = sample.unit_id,
                unix = sample.unix,
                value = distance.value,
                duration_ms,
                "calculated distance"
            ),
            Err(e) => error!(
                operation = "calculate",
                unit_id = sample.unit_id,
                unix = sample.unix,
                duration_ms,
                error = %e,
                "calculate failed"
            ),
        }

        result
    }
}

/// Logging decorator for the aggregator contract, symmetric to
/// [`LoggingCalculator`].
pub struct LoggingAggregator<A> {
    inner: A,
}

impl<A: InvoiceAggregator> LoggingAggregator<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<A: InvoiceAggregator> InvoiceAggregator for LoggingAggregator<A> {
    async fn aggregate_distance(&self, distance: Distance) -> DomainResult<()> {
        let start = Instant::now();
        let result = self.inner.aggregate_distance(distance).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => info!(
                operation = "aggregate_distance",
                unit_id = distance.unit_id,
                value = distance.value,
                duration_ms,
                "aggregated distance"
            ),
            Err(e) => error!(
                operation = "aggregate_distance",
                unit_id = distance.unit_id,
                value = distance.value,
                duration_ms,
                error = %e,
                "aggregate_distance failed"
            ),
        }

        result
    }

    async fn get_invoice(&self, unit_id: i64) -> DomainResult<Invoice> {
        let start = Instant::now();
        let result = self.inner.get_invoice(unit_id).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(invoice) => info!(
                operation = "get_invoice",
                unit_id,
                total_distance = invoice.total_distance,
                amount = invoice.amount,
                duration_ms,
                "fetched invoice"
            ),
            Err(e) => error!(
                operation = "get_invoice",
                unit_id,
                duration_ms,
                error = %e,
                "get_invoice failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::MockDistanceCalculator;
    use crate::error::DomainError;
    use crate::invoice_service::MockInvoiceAggregator;
    use crate::types::Reading;

    #[test]
    fn calculator_middleware_forwards_result_unchanged() {
        let mut inner = MockDistanceCalculator::new();
        inner.expect_calculate().times(1).returning(|sample| {
            Ok(Distance {
                unit_id: sample.unit_id,
                value: 4.2,
                unix: sample.unix,
            })
        });

        let wrapped = LoggingCalculator::new(inner);
        let sample = TelemetrySample {
            unit_id: 1,
            reading: Reading::Travelled(4.2),
            unix: 100,
        };

        let distance = wrapped.calculate(&sample).unwrap();
        assert_eq!(distance.value, 4.2);
    }

    #[test]
    fn calculator_middleware_preserves_error_identity() {
        let mut inner = MockDistanceCalculator::new();
        inner
            .expect_calculate()
            .times(1)
            .returning(|_| Err(DomainError::InvalidSample("bad".to_string())));

        let wrapped = LoggingCalculator::new(inner);
        let sample = TelemetrySample {
            unit_id: 1,
            reading: Reading::Travelled(1.0),
            unix: 100,
        };

        assert!(matches!(
            wrapped.calculate(&sample),
            Err(DomainError::InvalidSample(_))
        ));
    }

    #[test]
    fn middleware_layers_compose() {
        let mut inner = MockDistanceCalculator::new();
        inner.expect_calculate().times(1).returning(|sample| {
            Ok(Distance {
                unit_id: sample.unit_id,
                value: 1.0,
                unix: sample.unix,
            })
        });

        let wrapped = LoggingCalculator::new(LoggingCalculator::new(inner));
        let sample = TelemetrySample {
            unit_id: 1,
            reading: Reading::Travelled(1.0),
            unix: 100,
        };

        assert!(wrapped.calculate(&sample).is_ok());
    }

    #[tokio::test]
    async fn aggregator_middleware_forwards_both_operations() {
        let mut inner = MockInvoiceAggregator::new();
        inner
            .expect_aggregate_distance()
            .times(1)
            .returning(|_| Ok(()));
        inner.expect_get_invoice().times(1).returning(|unit_id| {
            Ok(Invoice {
                unit_id,
                total_distance: 2.0,
                amount: 6.3,
            })
        });

        let wrapped = LoggingAggregator::new(inner);

        wrapped
            .aggregate_distance(Distance {
                unit_id: 1,
                value: 2.0,
                unix: 100,
            })
            .await
            .unwrap();
        let invoice = wrapped.get_invoice(1).await.unwrap();
        assert_eq!(invoice.amount, 6.3);
    }

    #[tokio::test]
    async fn aggregator_middleware_preserves_not_found() {
        let mut inner = MockInvoiceAggregator::new();
        inner
            .expect_get_invoice()
            .times(1)
            .returning(|unit_id| Err(DomainError::InvoiceNotFound(unit_id)));

        let wrapped = LoggingAggregator::new(inner);

        assert!(matches!(
            wrapped.get_invoice(7).await,
            Err(DomainError::InvoiceNotFound(7))
        ));
    }
}
