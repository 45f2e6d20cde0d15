//! Fixed-cadence poll timer.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// Invokes a callback on a fixed period until stopped.
///
/// At most one timer runs per scheduler: [`PollScheduler::start`] stops the
/// previous timer before arming a new one. Each invocation holds the timer's
/// running flag, so [`PollScheduler::stop`] waits for an in-progress callback
/// and no invocation begins after `stop` returns.
#[derive(Debug, Default)]
pub struct PollScheduler {
    running: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start invoking `on_tick` every `period`, the first time one full
    /// period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let running = Arc::new(Mutex::new(true));
        self.running = running.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let active = running.lock().unwrap_or_else(PoisonError::into_inner);
                if !*active {
                    break;
                }
                on_tick();
            }
        }));
    }

    /// Stop the timer. Idempotent.
    pub fn stop(&mut self) {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some() && *self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
