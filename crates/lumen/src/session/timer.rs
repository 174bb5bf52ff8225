use std::time::Duration;

use tokio::time::Instant;

/// A cancelable delayed action. The window is open from [`Deadline::restart`]
/// until the delay passes or [`Deadline::cancel`] is called; restarting an
/// open window pushes its end back.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn restart(&mut self, delay: Duration) {
        self.at = Some(Instant::now() + delay);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_active(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() < at)
    }

    /// Whether an expiry is still waiting to be observed by [`Deadline::expired`].
    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Resolves once the window closes. Never resolves while disarmed.
    pub async fn expired(&self) {
        match self.at {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_restart() {
        let mut deadline = Deadline::default();
        assert!(!deadline.is_active());
        assert!(!deadline.is_armed());

        deadline.restart(Duration::from_secs(1));
        tokio::time::advance(Duration::from_millis(800)).await;
        assert!(deadline.is_active());

        deadline.restart(Duration::from_secs(1));
        tokio::time::advance(Duration::from_millis(800)).await;
        assert!(deadline.is_active());

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!deadline.is_active());
        assert!(deadline.is_armed());

        deadline.cancel();
        assert!(!deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expired() {
        let mut deadline = Deadline::default();
        deadline.restart(Duration::from_secs(10));
        let started = Instant::now();
        deadline.expired().await;
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(!deadline.is_active());
    }
}
