use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Error type for scheduling recurring tasks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task interval must be greater than zero")]
    ZeroInterval,
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
    #[error("{0}")]
    Custom(String),
}

/// `TaskConfig` contains the required config to schedule a recurring task
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TaskConfig {
    pub interval: Duration,
    pub missed_tick: MissedTickBehavior,
}

impl TaskConfig {
    pub fn new(interval: Duration, missed_tick: MissedTickBehavior) -> Self {
        Self {
            interval,
            missed_tick,
        }
    }

    /// `tokio::time::interval` panics on a zero period, reject it up front
    pub fn validate(&self) -> Result<(), TaskError> {
        match self.interval.is_zero() {
            true => Err(TaskError::ZeroInterval),
            false => Ok(()),
        }
    }

    fn default_interval() -> Duration {
        Duration::from_millis(100)
    }

    fn default_missed_tick() -> MissedTickBehavior {
        // A late sweep should not be followed by a burst of catch-up sweeps
        MissedTickBehavior::Delay
    }
}

impl Default for TaskConfig {
    /// Creates a `TaskConfig` with an interval of 100 milliseconds that delays on missed ticks
    fn default() -> Self {
        Self {
            interval: TaskConfig::default_interval(),
            missed_tick: TaskConfig::default_missed_tick(),
        }
    }
}

impl From<Duration> for TaskConfig {
    fn from(interval: Duration) -> Self {
        Self::new(interval, TaskConfig::default_missed_tick())
    }
}
