use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default per-question answer budget, in seconds.
pub const DEFAULT_ANSWER_SECONDS: u64 = 160;

/// Expiry signal sent when a countdown reaches zero. The generation lets the
/// receiver tell a live timer's signal apart from one that raced a cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerExpired {
    pub generation: u64,
}

/// Drives the fixed answer-time budget for the active question.
///
/// At most one countdown is live at a time: `start` cancels any previous one
/// first, and `cancel` is idempotent. The expiry signal is sent at most once
/// per generation.
#[derive(Debug, Default)]
pub struct TimerController {
    task: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
    generation: u64,
}

impl TimerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh countdown and returns its generation.
    pub fn start(&mut self, duration: Duration, tx: mpsc::Sender<TimerExpired>) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        self.deadline = Some(Instant::now() + duration);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if tx.send(TimerExpired { generation }).await.is_err() {
                tracing::debug!(generation, "timer expiry dropped: receiver is gone");
            }
        }));
        generation
    }

    /// Stops the countdown. Safe to call when no timer is running or when the
    /// timer has already expired.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.deadline = None;
    }

    /// Whether an expiry signal belongs to the countdown that is still
    /// considered live. Signals from cancelled or superseded timers fail this
    /// check and must be ignored.
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && self.generation == generation
    }

    /// Whole seconds left on the clock; zero when expired or not running.
    pub fn remaining_seconds(&self) -> u64 {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()).as_secs(),
            None => 0,
        }
    }
}

impl Drop for TimerController {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn fires_exactly_once_at_expiry() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TimerController::new();
        let generation = timer.start(Duration::from_millis(20), tx);

        let expired = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timer should fire")
            .expect("channel open");
        assert_eq!(expired.generation, generation);
        assert!(timer.is_current(generation));

        sleep(Duration::from_millis(40)).await;
        assert!(rx.try_recv().is_err(), "expiry must be sent only once");
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[tokio::test]
    async fn cancel_suppresses_expiry_and_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TimerController::new();
        let generation = timer.start(Duration::from_millis(30), tx);

        timer.cancel();
        timer.cancel();
        assert!(!timer.is_current(generation));
        assert_eq!(timer.remaining_seconds(), 0);

        sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err(), "cancelled timer must not fire");
    }

    #[tokio::test]
    async fn restart_supersedes_previous_countdown() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = TimerController::new();
        let first = timer.start(Duration::from_millis(200), tx.clone());
        let second = timer.start(Duration::from_millis(20), tx);
        assert_ne!(first, second);
        assert!(!timer.is_current(first));

        let expired = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("second timer should fire")
            .expect("channel open");
        assert_eq!(expired.generation, second);

        sleep(Duration::from_millis(250)).await;
        assert!(rx.try_recv().is_err(), "first timer was aborted");
    }

    #[tokio::test]
    async fn remaining_seconds_tracks_deadline() {
        let (tx, _rx) = mpsc::channel(4);
        let mut timer = TimerController::new();
        assert_eq!(timer.remaining_seconds(), 0);

        timer.start(Duration::from_secs(160), tx);
        let remaining = timer.remaining_seconds();
        assert!(remaining > 150 && remaining <= 160);

        timer.cancel();
        assert_eq!(timer.remaining_seconds(), 0);
    }
}
