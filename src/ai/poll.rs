use std::future::Future;
use std::time::Duration;

/// Bounded fixed-interval polling of an asynchronous provider job.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// What one status check of the job reported.
#[derive(Debug)]
pub enum PollStatus<T> {
    Pending,
    Done(T),
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("job failed: {0}")]
    Failed(String),
    #[error("job still pending after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("status check failed: {0}")]
    Check(anyhow::Error),
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Run `check` until it reports a terminal state or the attempt budget
    /// runs out. Sleeps `interval` between attempts, never after the last.
    pub async fn run<T, F, Fut>(&self, mut check: F) -> Result<T, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<PollStatus<T>>>,
    {
        for attempt in 1..=self.max_attempts {
            match check().await.map_err(PollError::Check)? {
                PollStatus::Done(value) => return Ok(value),
                PollStatus::Failed(reason) => return Err(PollError::Failed(reason)),
                PollStatus::Pending => {
                    tracing::debug!("Job pending (attempt {}/{})", attempt, self.max_attempts);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }
        Err(PollError::TimedOut {
            attempts: self.max_attempts,
        })
    }
}

/// Exponential backoff for rate-limited calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn completes_when_job_finishes() {
        let calls = AtomicU32::new(0);
        let result = fast(5)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(if n == 3 {
                        PollStatus::Done("transcript")
                    } else {
                        PollStatus::Pending
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "transcript");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn error_status_stops_polling() {
        let calls = AtomicU32::new(0);
        let err = fast(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(PollStatus::<()>::Failed("bad audio".into())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Failed(ref r) if r == "bad audio"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_budget_times_out() {
        let calls = AtomicU32::new(0);
        let err = fast(4)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(PollStatus::<()>::Pending) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::TimedOut { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn status_check_error_aborts() {
        let err = fast(3)
            .run(|| async { Err::<PollStatus<()>, _>(anyhow::anyhow!("connection reset")) })
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Check(_)));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }
}
