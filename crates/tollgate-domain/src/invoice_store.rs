use async_trait::async_trait;

use crate::error::DomainResult;
use crate::types::{Distance, Invoice, PricingModel};

/// Storage port for invoices. The in-memory map is the reference
/// implementation; a durable store implements the same contract.
///
/// Implementations must serialize `accumulate` per unit (no lost updates
/// under concurrent calls for the same unit) while leaving distinct units
/// free of contention.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Atomically fold the distance into the unit's invoice, creating the
    /// invoice on first contact, and recompute the amount with `pricing`.
    /// Returns the updated snapshot.
    async fn accumulate(
        &self,
        distance: &Distance,
        pricing: &PricingModel,
    ) -> DomainResult<Invoice>;

    /// Current snapshot for a unit, if the unit has ever been aggregated.
    async fn invoice(&self, unit_id: i64) -> DomainResult<Option<Invoice>>;
}
