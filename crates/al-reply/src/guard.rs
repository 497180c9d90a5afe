use crate::{CorrelationListener, HandlerError, ListenerHook, ReplyHandler};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

/// Delivers `hook` to `listener`, isolating errors and panics from the caller.
/// Returns `true` only if the hook completed cleanly.
pub(crate) fn guarded_notify(
    listener: &dyn CorrelationListener,
    hook: ListenerHook,
    correlation_id: &str,
) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| hook.deliver(listener, correlation_id))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(%hook, correlation_id, error = %e, "listener hook failed");
            false
        }
        Err(payload) => {
            tracing::warn!(
                %hook,
                correlation_id,
                panic = %panic_message(payload.as_ref()),
                "listener hook panicked"
            );
            false
        }
    }
}

/// Invokes `handler.on_timeout`, turning a panic into `HandlerError::Panicked` so one handler can't take down a sweep
pub(crate) fn guarded_timeout(
    handler: &dyn ReplyHandler,
    correlation_id: &str,
) -> Result<(), HandlerError> {
    panic::catch_unwind(AssertUnwindSafe(|| handler.on_timeout(correlation_id)))
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
