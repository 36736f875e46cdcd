use async_trait::async_trait;

use crate::error::ClientResult;
use crate::types::{Distance, Invoice};

/// Transport client port used by producers to reach the aggregator.
///
/// One adapter exists per wire protocol; all of them normalize to the same
/// request shape, so which transport a deployment picks is never a
/// behavioral choice. Adapters own their connection lifecycle and apply the
/// configured per-call timeout.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AggregatorClient: Send + Sync {
    /// Deliver one distance event. Succeeds only once the server-side
    /// adapter accepted the request and the engine applied it.
    async fn aggregate(&self, distance: Distance) -> ClientResult<()>;

    /// Fetch the current invoice for a unit.
    async fn get_invoice(&self, unit_id: i64) -> ClientResult<Invoice>;
}
