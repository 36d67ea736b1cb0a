//! Bounded retry for eventually consistent preconditions
//!
//! Seed data and dependent resources (device groups) appear asynchronously
//! relative to test start. The poller retries a caller-supplied probe on a
//! fixed interval and gives up after a fixed number of attempts, so a broken
//! precondition fails fast instead of hanging the run.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{HarnessError, Result};

/// Attempt budget and spacing for one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub interval: Duration,
}

/// One probe invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollAttempt {
    /// 1-based attempt number
    pub index: u32,
    /// Time since the poll started, measured when the probe returned
    pub elapsed: Duration,
    pub satisfied: bool,
}

/// What happened during one poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    pub satisfied: bool,
    pub attempts: Vec<PollAttempt>,
    /// Number of inter-attempt suspensions
    pub suspensions: u32,
    pub elapsed: Duration,
}

impl PollReport {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

impl PollPolicy {
    /// Cross-service dependencies: device groups, seed data
    pub const DEPENDENCY: Self = Self::new(5, Duration::from_secs(10));

    /// Service liveness right after start-up
    pub const READINESS: Self = Self::new(30, Duration::from_millis(100));

    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Worst-case time spent suspended
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }

    /// Run the probe until it holds or the budget is exhausted
    pub async fn run<F, Fut>(&self, mut probe: F) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let start = Instant::now();
        let mut report = PollReport::default();

        for index in 1..=self.max_attempts {
            let satisfied = probe().await;
            let attempt = PollAttempt {
                index,
                elapsed: start.elapsed(),
                satisfied,
            };
            debug!(
                attempt = index,
                max_attempts = self.max_attempts,
                satisfied,
                "Poll attempt"
            );
            report.attempts.push(attempt);

            if satisfied {
                report.satisfied = true;
                break;
            }
            if index < self.max_attempts {
                tokio::time::sleep(self.interval).await;
                report.suspensions += 1;
            }
        }

        report.elapsed = start.elapsed();
        report
    }

    /// Like [`run`](Self::run), but exhaustion becomes
    /// [`HarnessError::PreconditionNotMet`]
    pub async fn require<F, Fut>(&self, what: &str, probe: F) -> Result<PollReport>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let report = self.run(probe).await;
        if report.satisfied {
            Ok(report)
        } else {
            Err(HarnessError::PreconditionNotMet {
                what: what.to_string(),
                attempts: report.attempt_count(),
            })
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::DEPENDENCY
    }
}

/// Call `probe` up to `max_attempts` times, `interval` apart, until it
/// returns true. Returns false when the budget runs out.
pub async fn poll_until<F, Fut>(probe: F, max_attempts: u32, interval: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    PollPolicy::new(max_attempts, interval)
        .run(probe)
        .await
        .satisfied
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting(
        succeed_on: Option<u32>,
    ) -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<bool>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let probe = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(succeed_on.is_some_and(|target| n >= target))
        };
        (calls, probe)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_consumes_one_attempt() {
        let (calls, probe) = counting(Some(1));
        let report = PollPolicy::new(5, Duration::from_secs(10)).run(probe).await;

        assert!(report.satisfied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.suspensions, 0);
        assert_eq!(report.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_makes_exactly_max_attempts() {
        let (calls, probe) = counting(None);
        let report = PollPolicy::new(5, Duration::from_secs(10)).run(probe).await;

        assert!(!report.satisfied);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(report.suspensions, 4);
        // No sleep after the last attempt
        assert!(report.elapsed >= Duration::from_secs(40));
        assert!(report.elapsed < Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_third_attempt() {
        let (calls, probe) = counting(Some(3));
        let satisfied = poll_until(probe, 5, Duration::from_secs(1)).await;

        assert!(satisfied);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_recorded_in_order() {
        let (_, probe) = counting(Some(2));
        let report = PollPolicy::new(3, Duration::from_millis(500)).run(probe).await;

        let indices: Vec<u32> = report.attempts.iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(!report.attempts[0].satisfied);
        assert!(report.attempts[1].satisfied);
        assert!(report.attempts[1].elapsed >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_never_probes() {
        let (calls, probe) = counting(Some(1));
        assert!(!poll_until(probe, 0, Duration::from_secs(1)).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_require_reports_precondition() {
        let (_, probe) = counting(None);
        let err = PollPolicy::new(2, Duration::from_secs(1))
            .require("device groups", probe)
            .await
            .unwrap_err();

        assert!(err.is_precondition());
        assert!(err.to_string().contains("after 2 attempt(s)"));
    }

    #[test]
    fn test_budget() {
        assert_eq!(PollPolicy::DEPENDENCY.budget(), Duration::from_secs(40));
        assert_eq!(PollPolicy::new(0, Duration::from_secs(1)).budget(), Duration::ZERO);
    }
}
