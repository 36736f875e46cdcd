use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use tollgate_domain::{AggregatorClient, ClientResult, Distance};

/// Bounds for the transport retry loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first; clamped to at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// delay = min(base * 2^attempt, max)
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}

/// Delivers distances through an [`AggregatorClient`], retrying transport
/// failures with bounded exponential backoff.
///
/// Business rejections are returned on the first occurrence; only transient
/// errors consume attempts. After the ceiling the last transport error is
/// returned so the caller can drop the event and move on.
pub struct DistanceForwarder {
    client: Arc<dyn AggregatorClient>,
    policy: RetryPolicy,
}

impl DistanceForwarder {
    pub fn new(client: Arc<dyn AggregatorClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn forward(&self, distance: Distance) -> ClientResult<()> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match self.client.aggregate(distance).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    debug!(
                        unit_id = distance.unit_id,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying forward after transport error"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.expect("retry loop returns early unless an error was recorded"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tollgate_domain::{ClientError, MockAggregatorClient};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn sample_distance() -> Distance {
        Distance {
            unit_id: 42,
            value: 10.0,
            unix: 100,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let mut client = MockAggregatorClient::new();
        client.expect_aggregate().times(1).returning(|_| Ok(()));

        let forwarder = DistanceForwarder::new(Arc::new(client), fast_policy(3));

        assert!(forwarder.forward(sample_distance()).await.is_ok());
    }

    #[tokio::test]
    async fn two_transport_failures_then_success_delivers_exactly_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut client = MockAggregatorClient::new();
        client.expect_aggregate().times(3).returning(move |_| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                Err(ClientError::Transport(anyhow::anyhow!("connection reset")))
            } else {
                Ok(())
            }
        });

        let forwarder = DistanceForwarder::new(Arc::new(client), fast_policy(3));

        assert!(forwarder.forward(sample_distance()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_transport_error() {
        let mut client = MockAggregatorClient::new();
        client
            .expect_aggregate()
            .times(3)
            .returning(|_| Err(ClientError::Transport(anyhow::anyhow!("unreachable"))));

        let forwarder = DistanceForwarder::new(Arc::new(client), fast_policy(3));

        let result = forwarder.forward(sample_distance()).await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
    }

    #[tokio::test]
    async fn business_rejection_is_not_retried() {
        let mut client = MockAggregatorClient::new();
        client
            .expect_aggregate()
            .times(1)
            .returning(|_| Err(ClientError::Rejected("negative value".to_string())));

        let forwarder = DistanceForwarder::new(Arc::new(client), fast_policy(3));

        let result = forwarder.forward(sample_distance()).await;
        assert!(matches!(result, Err(ClientError::Rejected(_))));
    }

    #[test]
    fn backoff_doubles_up_to_the_ceiling() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }
}
