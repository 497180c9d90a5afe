use crate::CorrelationError;
use al_core::TaskConfig;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// `CorrelationConfig` contains the settings for a `CorrelationMap`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct CorrelationConfig {
    /// How often expired correlation ids are swept
    pub poll_interval: Duration,
}

impl CorrelationConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn from_millis(poll_interval_millis: u64) -> Self {
        Self::new(Duration::from_millis(poll_interval_millis))
    }

    pub fn validate(&self) -> Result<(), CorrelationError> {
        match self.poll_interval.is_zero() {
            true => Err(CorrelationError::InvalidPollInterval),
            false => Ok(()),
        }
    }

    /// The recurring sweep task's config, a late sweep is delayed rather than repeated
    pub fn task_config(&self) -> TaskConfig {
        TaskConfig::new(self.poll_interval, MissedTickBehavior::Delay)
    }

    fn default_poll_interval() -> Duration {
        Duration::from_secs(1)
    }
}

impl Default for CorrelationConfig {
    /// Creates a `CorrelationConfig` sweeping once a second
    fn default() -> Self {
        Self {
            poll_interval: CorrelationConfig::default_poll_interval(),
        }
    }
}

impl From<Duration> for CorrelationConfig {
    fn from(poll_interval: Duration) -> Self {
        Self::new(poll_interval)
    }
}
