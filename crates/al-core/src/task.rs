use crate::{RecurringFn, TaskConfig, TaskError};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{runtime::Handle, task::JoinHandle, time::Instant};

/// `Scheduler` runs a closure over and over at a fixed period.
/// Owners of periodic work take a `Scheduler` rather than spawning threads themselves.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run every `config.interval`, the first run happens one interval from now
    fn schedule_at_fixed_rate(
        &self,
        config: TaskConfig,
        task: Box<dyn RecurringFn>,
    ) -> Result<Box<dyn ScheduledTask>, TaskError>;
}

/// Handle to a task registered with a `Scheduler`
pub trait ScheduledTask: Send + Sync + std::fmt::Debug {
    /// Stops any future runs, a run already in progress is left to finish
    fn cancel(&self);
    fn is_cancelled(&self) -> bool;
}

/// `Scheduler` backed by a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the current context, erroring when called outside of one
    pub fn current() -> Result<Self, TaskError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| TaskError::NoRuntime(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_at_fixed_rate(
        &self,
        config: TaskConfig,
        mut task: Box<dyn RecurringFn>,
    ) -> Result<Box<dyn ScheduledTask>, TaskError> {
        config.validate()?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_clone = cancelled.clone();

        let TaskConfig {
            interval: period,
            missed_tick,
        } = config;

        let handle = self.handle.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(missed_tick);

            loop {
                interval.tick().await;

                // Check if cancelled
                if cancelled_clone.load(Ordering::Acquire) {
                    break;
                }

                task();
            }
            tracing::trace!("recurring task stopped");
        });
        tracing::debug!(?period, "scheduled recurring task");

        Ok(Box::new(TokioScheduledTask { handle, cancelled }))
    }
}

/// `TokioScheduledTask` handles the background task spawned by `TokioScheduler`
#[derive(Debug)]
pub struct TokioScheduledTask {
    handle: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl ScheduledTask for TokioScheduledTask {
    fn cancel(&self) {
        // Signal cancelled for a run currently in flight, then stop the spawned task at its next `await`
        self.cancelled.store(true, Ordering::Release);
        self.handle.abort();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire) || self.handle.is_finished()
    }
}

impl Drop for TokioScheduledTask {
    /// `TokioScheduledTask` aborts its spawned task on drop
    fn drop(&mut self) {
        self.cancel();
    }
}
