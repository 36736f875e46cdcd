use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::types::{Distance, Reading, TelemetrySample};

/// Port for turning a raw telemetry sample into a canonical [`Distance`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait DistanceCalculator: Send + Sync {
    fn calculate(&self, sample: &TelemetrySample) -> DomainResult<Distance>;
}

/// Last accepted reading for a unit.
#[derive(Debug, Clone, Copy)]
struct UnitState {
    position: Option<(f64, f64)>,
    unix: i64,
}

/// Computes the distance delta between consecutive positional readings and
/// passes scalar readings through unchanged.
///
/// Keeps the last accepted reading per unit. Stale or out-of-order samples
/// are rejected here, at the ingestion edge, so a replayed position is never
/// summed twice downstream. State updates only when a sample is accepted.
pub struct ObuDistanceCalculator {
    units: DashMap<i64, UnitState>,
}

impl ObuDistanceCalculator {
    pub fn new() -> Self {
        Self {
            units: DashMap::new(),
        }
    }
}

impl Default for ObuDistanceCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl DistanceCalculator for ObuDistanceCalculator {
    fn calculate(&self, sample: &TelemetrySample) -> DomainResult<Distance> {
        if sample.unit_id <= 0 {
            return Err(DomainError::InvalidSample(format!(
                "unit id must be positive, got {}",
                sample.unit_id
            )));
        }
        validate_reading(&sample.reading)?;

        // The entry guard serializes concurrent samples for the same unit.
        let value = match self.units.entry(sample.unit_id) {
            Entry::Occupied(mut occupied) => {
                let state = *occupied.get();
                if sample.unix <= state.unix {
                    return Err(DomainError::InvalidSample(format!(
                        "non-increasing timestamp {} for unit {} (last accepted {})",
                        sample.unix, sample.unit_id, state.unix
                    )));
                }
                let value = match sample.reading {
                    Reading::Travelled(v) => v,
                    Reading::Position { x, y } => match state.position {
                        Some((px, py)) => (x - px).hypot(y - py),
                        // No prior position on record; this reading seeds it.
                        None => 0.0,
                    },
                };
                occupied.insert(UnitState {
                    position: position_of(&sample.reading).or(state.position),
                    unix: sample.unix,
                });
                value
            }
            Entry::Vacant(vacant) => {
                let value = match sample.reading {
                    Reading::Travelled(v) => v,
                    Reading::Position { .. } => 0.0,
                };
                vacant.insert(UnitState {
                    position: position_of(&sample.reading),
                    unix: sample.unix,
                });
                value
            }
        };

        debug!(
            unit_id = sample.unit_id,
            value,
            unix = sample.unix,
            "calculated distance"
        );

        Ok(Distance {
            unit_id: sample.unit_id,
            value,
            unix: sample.unix,
        })
    }
}

fn position_of(reading: &Reading) -> Option<(f64, f64)> {
    match reading {
        Reading::Position { x, y } => Some((*x, *y)),
        Reading::Travelled(_) => None,
    }
}

fn validate_reading(reading: &Reading) -> DomainResult<()> {
    match reading {
        Reading::Travelled(v) => {
            if !v.is_finite() || *v < 0.0 {
                return Err(DomainError::InvalidSample(format!(
                    "travelled distance must be finite and non-negative, got {v}"
                )));
            }
        }
        Reading::Position { x, y } => {
            if !x.is_finite() || !y.is_finite() {
                return Err(DomainError::InvalidSample(format!(
                    "position coordinates must be finite, got ({x}, {y})"
                )));
            }
        }
    }
    Ok(())
}
