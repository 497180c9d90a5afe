use al_core::{TaskError, TimeoutMapError};
use std::sync::PoisonError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    #[error("poll interval must be greater than zero")]
    InvalidPollInterval,
    #[error("correlation map lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("failed to schedule the expiry sweep: {0}")]
    Schedule(#[from] TaskError),
}

impl<T> From<PoisonError<T>> for CorrelationError {
    fn from(err: PoisonError<T>) -> Self {
        CorrelationError::LockPoisoned(err.to_string())
    }
}

impl From<TimeoutMapError> for CorrelationError {
    fn from(err: TimeoutMapError) -> Self {
        match err {
            TimeoutMapError::LockPoisoned(msg) => CorrelationError::LockPoisoned(msg),
        }
    }
}

/// Failure reported by a `CorrelationListener` hook, never propagated past the registry
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("{0}")]
    Custom(String),
    #[error("{0}")]
    Other(#[from] BoxError),
}

impl ListenerError {
    pub fn custom(msg: impl Into<String>) -> Self {
        ListenerError::Custom(msg.into())
    }
}

/// Failure reported by `ReplyHandler::on_timeout`
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Custom(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Other(#[from] BoxError),
}

impl HandlerError {
    pub fn custom(msg: impl Into<String>) -> Self {
        HandlerError::Custom(msg.into())
    }
}
