/// Canonical distance record. Every transport converges to this shape before
/// any business logic runs; no wire type leaks past the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    pub unit_id: i64,
    /// Distance delta in canonical units, >= 0.
    pub value: f64,
    /// Producer clock, Unix seconds.
    pub unix: i64,
}

/// Running toll invoice for a single on-board unit. Owned exclusively by the
/// aggregation engine; created lazily on the first distance for a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invoice {
    pub unit_id: i64,
    pub total_distance: f64,
    pub amount: f64,
}

/// A raw telemetry reading as decoded off the event stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub unit_id: i64,
    pub reading: Reading,
    /// Producer clock, Unix seconds.
    pub unix: i64,
}

/// What the on-board unit reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Planar position in canonical units; the calculator derives the delta
    /// to the previous accepted position.
    Position { x: f64, y: f64 },
    /// Distance already computed on the unit; passed through unchanged.
    Travelled(f64),
}

/// Pricing function applied whenever an invoice is recomputed.
#[derive(Debug, Clone, Copy)]
pub struct PricingModel {
    /// Price per canonical distance unit.
    pub rate: f64,
}

impl PricingModel {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn amount_for(&self, total_distance: f64) -> f64 {
        total_distance * self.rate
    }
}

impl Default for PricingModel {
    fn default() -> Self {
        Self { rate: 3.15 }
    }
}
