use std::time::Duration;
use tokio::time::Instant;

/// A one-shot, restartable deadline. Armed on the first message into an
/// empty buffer, disarmed on every flush. `wait_timeout` blocks forever
/// while disarmed so it can be raced against the mux receive in a
/// `tokio::select!` without ever firing spuriously.
pub struct TimerManager {
    max_time: Duration,
    deadline: Option<Instant>,
}

impl TimerManager {
    pub fn new(max_time_seconds: f64) -> Self {
        Self {
            max_time: Duration::from_secs_f64(max_time_seconds),
            deadline: None,
        }
    }

    /// Idempotent: re-arming an already-armed timer leaves the existing
    /// deadline untouched.
    pub fn arm(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.max_time);
        }
    }

    pub fn reset(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub async fn wait_timeout(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}
