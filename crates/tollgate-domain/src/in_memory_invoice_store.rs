use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::DomainResult;
use crate::invoice_store::InvoiceStore;
use crate::types::{Distance, Invoice, PricingModel};

/// In-memory implementation of [`InvoiceStore`] over a sharded map.
///
/// The map's per-key entry lock serializes accumulation for a single unit;
/// units on different shards proceed in parallel.
pub struct InMemoryInvoiceStore {
    invoices: DashMap<i64, Invoice>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self {
            invoices: DashMap::new(),
        }
    }
}

impl Default for InMemoryInvoiceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn accumulate(
        &self,
        distance: &Distance,
        pricing: &PricingModel,
    ) -> DomainResult<Invoice> {
        let entry = self
            .invoices
            .entry(distance.unit_id)
            .and_modify(|invoice| {
                invoice.total_distance += distance.value;
                invoice.amount = pricing.amount_for(invoice.total_distance);
            })
            .or_insert_with(|| Invoice {
                unit_id: distance.unit_id,
                total_distance: distance.value,
                amount: pricing.amount_for(distance.value),
            });
        Ok(*entry)
    }

    async fn invoice(&self, unit_id: i64) -> DomainResult<Option<Invoice>> {
        Ok(self.invoices.get(&unit_id).map(|invoice| *invoice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn distance(unit_id: i64, value: f64) -> Distance {
        Distance {
            unit_id,
            value,
            unix: 0,
        }
    }

    #[tokio::test]
    async fn accumulate_creates_invoice_on_first_contact() {
        let store = InMemoryInvoiceStore::new();
        let pricing = PricingModel::new(2.0);

        let invoice = store.accumulate(&distance(42, 10.0), &pricing).await.unwrap();

        assert_eq!(invoice.unit_id, 42);
        assert_eq!(invoice.total_distance, 10.0);
        assert_eq!(invoice.amount, 20.0);
    }

    #[tokio::test]
    async fn accumulate_folds_and_reprices() {
        let store = InMemoryInvoiceStore::new();
        let pricing = PricingModel::new(2.0);

        store.accumulate(&distance(42, 10.0), &pricing).await.unwrap();
        let invoice = store.accumulate(&distance(42, 5.5), &pricing).await.unwrap();

        assert_eq!(invoice.total_distance, 15.5);
        assert_eq!(invoice.amount, 31.0);
    }

    #[tokio::test]
    async fn invoice_returns_none_for_unknown_unit() {
        let store = InMemoryInvoiceStore::new();

        assert!(store.invoice(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_after_write_reflects_the_update() {
        let store = InMemoryInvoiceStore::new();
        let pricing = PricingModel::new(1.0);

        store.accumulate(&distance(1, 3.0), &pricing).await.unwrap();
        let invoice = store.invoice(1).await.unwrap().unwrap();

        assert_eq!(invoice.total_distance, 3.0);
    }

    #[tokio::test]
    async fn total_is_order_insensitive() {
        let pricing = PricingModel::new(1.0);

        let forward = InMemoryInvoiceStore::new();
        for value in [1.0, 2.0, 3.0, 4.0] {
            forward.accumulate(&distance(1, value), &pricing).await.unwrap();
        }

        let reversed = InMemoryInvoiceStore::new();
        for value in [4.0, 3.0, 2.0, 1.0] {
            reversed.accumulate(&distance(1, value), &pricing).await.unwrap();
        }

        assert_eq!(
            forward.invoice(1).await.unwrap().unwrap().total_distance,
            reversed.invoice(1).await.unwrap().unwrap().total_distance,
        );
    }

    #[tokio::test]
    async fn concurrent_writers_lose_no_updates() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let pricing = PricingModel::new(1.0);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.accumulate(&distance(1, 1.0), &pricing).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let invoice = store.invoice(1).await.unwrap().unwrap();
        assert_eq!(invoice.total_distance, 800.0);
    }

    #[tokio::test]
    async fn units_do_not_interfere() {
        let store = InMemoryInvoiceStore::new();
        let pricing = PricingModel::new(1.0);

        store.accumulate(&distance(1, 10.0), &pricing).await.unwrap();
        store.accumulate(&distance(2, 20.0), &pricing).await.unwrap();

        assert_eq!(store.invoice(1).await.unwrap().unwrap().total_distance, 10.0);
        assert_eq!(store.invoice(2).await.unwrap().unwrap().total_distance, 20.0);
    }
}
