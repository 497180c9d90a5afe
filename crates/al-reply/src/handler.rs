use crate::HandlerError;

/// `ReplyHandler` is the waiting side of a request/reply exchange.
/// The registry only ever calls `on_timeout`, and at most once per stored entry, when the entry expires before a reply removes it.
pub trait ReplyHandler: Send + Sync {
    fn on_timeout(&self, correlation_id: &str) -> Result<(), HandlerError>;
}

/// Blanket impl so plain closures can act as handlers
impl<F: Fn(&str) -> Result<(), HandlerError> + Send + Sync> ReplyHandler for F {
    fn on_timeout(&self, correlation_id: &str) -> Result<(), HandlerError> {
        self(correlation_id)
    }
}
