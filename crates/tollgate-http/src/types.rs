use serde::{Deserialize, Serialize};

/// JSON envelope for one distance event, mirroring the RPC request shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregateBody {
    pub obu_id: i64,
    pub value: f64,
    pub unix: i64,
}

/// JSON envelope for an invoice snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InvoiceBody {
    pub obu_id: i64,
    pub total_distance: f64,
    pub amount: f64,
}
