use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::invoice_store::InvoiceStore;
use crate::types::{Distance, Invoice, PricingModel};

/// The aggregation engine contract. Server-side transport adapters and the
/// in-process composition depend on this trait, never on a concrete engine.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait InvoiceAggregator: Send + Sync {
    /// Fold one distance event into the unit's invoice.
    ///
    /// The engine does not deduplicate: redelivering the same logical event
    /// adds it twice. Under at-least-once delivery the upstream consumer
    /// bounds redelivery by dropping events after its retry ceiling.
    async fn aggregate_distance(&self, distance: Distance) -> DomainResult<()>;

    /// Current invoice snapshot for a unit.
    async fn get_invoice(&self, unit_id: i64) -> DomainResult<Invoice>;
}

/// Aggregation engine over a pluggable [`InvoiceStore`].
///
/// Validates incoming distances and delegates the atomic per-unit fold to
/// the store; the store's locking granularity is what keeps unrelated units
/// free of contention.
pub struct InvoiceService {
    store: Arc<dyn InvoiceStore>,
    pricing: PricingModel,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn InvoiceStore>, pricing: PricingModel) -> Self {
        Self { store, pricing }
    }
}

#[async_trait]
impl InvoiceAggregator for InvoiceService {
    async fn aggregate_distance(&self, distance: Distance) -> DomainResult<()> {
        if distance.unit_id <= 0 {
            return Err(DomainError::InvalidSample(format!(
                "unit id must be positive, got {}",
                distance.unit_id
            )));
        }
        if !distance.value.is_finite() || distance.value < 0.0 {
            return Err(DomainError::InvalidSample(format!(
                "distance value must be finite and non-negative, got {}",
                distance.value
            )));
        }

        let invoice = self.store.accumulate(&distance, &self.pricing).await?;

        debug!(
            unit_id = invoice.unit_id,
            value = distance.value,
            total_distance = invoice.total_distance,
            amount = invoice.amount,
            "aggregated distance"
        );
        Ok(())
    }

    async fn get_invoice(&self, unit_id: i64) -> DomainResult<Invoice> {
        debug!(unit_id, "fetching invoice");

        self.store
            .invoice(unit_id)
            .await?
            .ok_or(DomainError::InvoiceNotFound(unit_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice_store::MockInvoiceStore;

    fn distance(unit_id: i64, value: f64) -> Distance {
        Distance {
            unit_id,
            value,
            unix: 0,
        }
    }

    #[tokio::test]
    async fn aggregate_distance_delegates_to_store() {
        let mut store = MockInvoiceStore::new();
        store
            .expect_accumulate()
            .withf(|d: &Distance, _: &PricingModel| d.unit_id == 42 && d.value == 10.0)
            .times(1)
            .returning(|d, p| {
                Ok(Invoice {
                    unit_id: d.unit_id,
                    total_distance: d.value,
                    amount: p.amount_for(d.value),
                })
            });

        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        assert!(service.aggregate_distance(distance(42, 10.0)).await.is_ok());
    }

    #[tokio::test]
    async fn aggregate_distance_rejects_non_positive_unit() {
        let store = MockInvoiceStore::new();
        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        let result = service.aggregate_distance(distance(0, 1.0)).await;
        assert!(matches!(result, Err(DomainError::InvalidSample(_))));
    }

    #[tokio::test]
    async fn aggregate_distance_rejects_negative_value() {
        let store = MockInvoiceStore::new();
        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        let result = service.aggregate_distance(distance(1, -4.0)).await;
        assert!(matches!(result, Err(DomainError::InvalidSample(_))));
    }

    #[tokio::test]
    async fn aggregate_distance_rejects_nan_value() {
        let store = MockInvoiceStore::new();
        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        let result = service.aggregate_distance(distance(1, f64::NAN)).await;
        assert!(matches!(result, Err(DomainError::InvalidSample(_))));
    }

    #[tokio::test]
    async fn aggregate_distance_propagates_store_error() {
        let mut store = MockInvoiceStore::new();
        store
            .expect_accumulate()
            .times(1)
            .returning(|_, _| Err(DomainError::StoreError(anyhow::anyhow!("disk full"))));

        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        let result = service.aggregate_distance(distance(1, 1.0)).await;
        assert!(matches!(result, Err(DomainError::StoreError(_))));
    }

    #[tokio::test]
    async fn get_invoice_maps_absent_unit_to_not_found() {
        let mut store = MockInvoiceStore::new();
        store.expect_invoice().times(1).returning(|_| Ok(None));

        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        let result = service.get_invoice(7).await;
        assert!(matches!(result, Err(DomainError::InvoiceNotFound(7))));
    }

    #[tokio::test]
    async fn get_invoice_returns_snapshot() {
        let mut store = MockInvoiceStore::new();
        store.expect_invoice().times(1).returning(|unit_id| {
            Ok(Some(Invoice {
                unit_id,
                total_distance: 15.5,
                amount: 48.825,
            }))
        });

        let service = InvoiceService::new(Arc::new(store), PricingModel::default());

        let invoice = service.get_invoice(42).await.unwrap();
        assert_eq!(invoice.total_distance, 15.5);
    }
}
