use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use tollgate_domain::{Reading, TelemetrySample};

use crate::producer::TelemetryProducer;

/// Configuration for the demo OBU fleet.
pub struct DemoProducerConfig {
    /// Interval between readings per emission round.
    pub interval: Duration,
    /// Number of simulated units; ids are 1..=fleet_size.
    pub fleet_size: i64,
    /// Maximum per-axis movement between readings, canonical units.
    pub max_step: f64,
}

impl Default for DemoProducerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            fleet_size: 3,
            max_step: 25.0,
        }
    }
}

/// Publish simulated OBU position readings until cancelled.
///
/// Each unit random-walks on the plane; every round emits one positional
/// reading per unit, stamped with the wall clock. Useful for driving the
/// pipeline without real hardware.
pub async fn run_demo_producer(
    ctx: CancellationToken,
    config: DemoProducerConfig,
    producer: TelemetryProducer,
) -> Result<()> {
    info!(fleet_size = config.fleet_size, "demo OBU producer started");

    let mut positions: Vec<(f64, f64)> = (0..config.fleet_size).map(|_| (0.0, 0.0)).collect();

    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                info!("received shutdown signal, stopping demo producer");
                break;
            }
            _ = tokio::time::sleep(config.interval) => {
                let unix = unix_now();

                for (index, position) in positions.iter_mut().enumerate() {
                    let (dx, dy) = {
                        let mut rng = rand::thread_rng();
                        (
                            rng.gen_range(-config.max_step..=config.max_step),
                            rng.gen_range(-config.max_step..=config.max_step),
                        )
                    };
                    position.0 += dx;
                    position.1 += dy;

                    let sample = TelemetrySample {
                        unit_id: index as i64 + 1,
                        reading: Reading::Position {
                            x: position.0,
                            y: position.1,
                        },
                        unix,
                    };

                    match producer.publish_sample(&sample).await {
                        Ok(()) => debug!(
                            unit_id = sample.unit_id,
                            x = position.0,
                            y = position.1,
                            "published demo reading"
                        ),
                        Err(e) => error!(
                            unit_id = sample.unit_id,
                            error = %e,
                            "failed to publish demo reading"
                        ),
                    }
                }
            }
        }
    }

    info!("demo producer stopped gracefully");
    Ok(())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
