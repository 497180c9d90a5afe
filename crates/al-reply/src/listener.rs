use crate::ListenerError;

/// `CorrelationListener` observes the lifecycle of correlation ids.
/// Hooks must return quickly, any error or panic is logged and dropped by the registry.
pub trait CorrelationListener: Send + Sync {
    fn on_put(&self, _correlation_id: &str) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_remove(&self, _correlation_id: &str) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_eviction(&self, _correlation_id: &str) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// The hook being delivered to a `CorrelationListener`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerHook {
    Put,
    Remove,
    Eviction,
}

impl ListenerHook {
    pub(crate) fn deliver(
        self,
        listener: &dyn CorrelationListener,
        correlation_id: &str,
    ) -> Result<(), ListenerError> {
        match self {
            ListenerHook::Put => listener.on_put(correlation_id),
            ListenerHook::Remove => listener.on_remove(correlation_id),
            ListenerHook::Eviction => listener.on_eviction(correlation_id),
        }
    }
}

impl std::fmt::Display for ListenerHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ListenerHook::Put => "on_put",
            ListenerHook::Remove => "on_remove",
            ListenerHook::Eviction => "on_eviction",
        })
    }
}
