//! Heartbeat deadline for a run.

use std::future::Future;
use std::time::Duration;

use tokio::time::{error::Elapsed, Instant};

/// A single re-armable deadline. Each heartbeat pushes the deadline out by
/// the full timeout, discarding the previous one.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    deadline: Instant,
}

impl Watchdog {
    /// Create a watchdog armed from now.
    pub fn arm(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// Record activity and re-arm.
    pub fn heartbeat(&mut self) {
        self.deadline = Instant::now() + self.timeout;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Await `fut`, failing if the current deadline passes first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        tokio::time::timeout_at(self.deadline, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_guard_elapses_after_silence() {
        let watchdog = Watchdog::arm(Duration::from_millis(10_500));
        let start = Instant::now();

        let result = watchdog.guard(std::future::pending::<()>()).await;
        assert!(result.is_err());
        assert_eq!(start.elapsed(), Duration::from_millis(10_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_rearms() {
        let mut watchdog = Watchdog::arm(Duration::from_secs(10));
        let first = watchdog.deadline();

        tokio::time::sleep(Duration::from_secs(6)).await;
        watchdog.heartbeat();
        assert_eq!(watchdog.deadline(), first + Duration::from_secs(6));

        // Would have expired under the first deadline
        let result = watchdog
            .guard(tokio::time::sleep(Duration::from_secs(8)))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_passes_output_through() {
        let watchdog = Watchdog::arm(Duration::from_secs(1));
        assert_eq!(watchdog.guard(async { 42 }).await.unwrap(), 42);
    }
}
