use crate::{
    guard::{guarded_notify, guarded_timeout},
    CorrelationConfig, CorrelationError, CorrelationListener, HandlerError, ListenerHook,
    ReplyHandler,
};
use al_core::{Deadline, ScheduledTask, Scheduler, TimeoutMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::time::Instant;

pub type SharedHandler = Arc<dyn ReplyHandler>;

/// Outcome of a single sweep over a `CorrelationMap`
#[derive(Debug, Default)]
pub struct SweepReport {
    evicted: Vec<String>,
    failures: Vec<(String, HandlerError)>,
}

impl SweepReport {
    /// Correlation ids this sweep removed, in eviction order
    pub fn evicted(&self) -> &[String] {
        &self.evicted
    }

    /// Handlers whose `on_timeout` failed, their entries are already gone
    pub fn failures(&self) -> &[(String, HandlerError)] {
        &self.failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// `CorrelationMap` tracks the reply handler of every outstanding correlation id.
///
/// Each entry carries its own deadline. A recurring sweep, run by the `Scheduler` given at construction,
/// evicts expired entries: the listener is told about the eviction, then the handler's `on_timeout` is invoked.
/// Taking an entry out of the map is atomic, so for any stored entry exactly one of `remove` or the sweep
/// gets it and the other sees nothing.
pub struct CorrelationMap {
    entries: TimeoutMap<String, SharedHandler>,
    // Association only, whoever registered the listener keeps it alive
    listener: RwLock<Option<Weak<dyn CorrelationListener>>>,
    sweep: Mutex<Option<Box<dyn ScheduledTask>>>,
    config: CorrelationConfig,
}

impl std::fmt::Debug for CorrelationMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationMap")
            .field("entries", &self.entries)
            .field("has_listener", &self.listener().is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl CorrelationMap {
    /// Creates a `CorrelationMap` and schedules its sweep every `poll_interval_millis`
    pub fn new(
        scheduler: &dyn Scheduler,
        poll_interval_millis: u64,
    ) -> Result<Arc<Self>, CorrelationError> {
        Self::with_config(scheduler, CorrelationConfig::from_millis(poll_interval_millis))
    }

    pub fn with_config(
        scheduler: &dyn Scheduler,
        config: CorrelationConfig,
    ) -> Result<Arc<Self>, CorrelationError> {
        config.validate()?;

        let map = Arc::new(Self {
            entries: TimeoutMap::new(),
            listener: RwLock::new(None),
            sweep: Mutex::new(None),
            config,
        });

        // The sweep only holds a `Weak` so the scheduler never keeps a dropped map alive
        let weak = Arc::downgrade(&map);
        let task = scheduler.schedule_at_fixed_rate(
            config.task_config(),
            Box::new(move || {
                if let Some(map) = weak.upgrade() {
                    map.purge();
                }
            }),
        )?;
        *map.sweep.lock()? = Some(task);
        tracing::debug!(poll_interval = ?config.poll_interval, "correlation map started");

        Ok(map)
    }

    pub fn config(&self) -> &CorrelationConfig {
        &self.config
    }

    /// Replaces the listener, last write wins
    pub fn set_listener<L: CorrelationListener + 'static>(&self, listener: &Arc<L>) {
        let listener: Weak<L> = Arc::downgrade(listener);
        self.set_listener_weak(listener);
    }

    /// Replaces the listener with an already downgraded reference, for callers holding `Arc<dyn CorrelationListener>`
    pub fn set_listener_weak(&self, listener: Weak<dyn CorrelationListener>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Stores `handler` under `correlation_id`, overwriting any previous entry without notifying it.
    /// `timeout_millis <= 0` means the entry never expires and can only be removed explicitly.
    pub fn put(
        &self,
        correlation_id: impl Into<String>,
        handler: SharedHandler,
        timeout_millis: i64,
    ) -> Result<(), CorrelationError> {
        let correlation_id = correlation_id.into();
        self.notify(ListenerHook::Put, &correlation_id);

        let deadline = Deadline::from_millis(timeout_millis, Instant::now());
        if self
            .entries
            .put(correlation_id.clone(), handler, deadline)?
            .is_some()
        {
            tracing::trace!(correlation_id = %correlation_id, "replaced pending handler");
        }
        Ok(())
    }

    /// Takes the handler for `correlation_id` out of circulation, it will never be timed out
    pub fn remove(&self, correlation_id: &str) -> Result<Option<SharedHandler>, CorrelationError> {
        self.notify(ListenerHook::Remove, correlation_id);
        Ok(self.entries.remove(correlation_id)?)
    }

    /// Looks up the handler without removing it or notifying the listener
    pub fn get(&self, correlation_id: &str) -> Result<Option<SharedHandler>, CorrelationError> {
        Ok(self.entries.get(correlation_id)?)
    }

    pub fn contains_key(&self, correlation_id: &str) -> Result<bool, CorrelationError> {
        Ok(self.entries.contains_key(correlation_id)?)
    }

    pub fn len(&self) -> Result<usize, CorrelationError> {
        Ok(self.entries.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, CorrelationError> {
        Ok(self.entries.is_empty()?)
    }

    pub fn keys(&self) -> Result<Vec<String>, CorrelationError> {
        Ok(self.entries.keys()?)
    }

    /// Runs one sweep now, evicting every entry expired at this instant
    pub fn purge(&self) -> SweepReport {
        let now = Instant::now();
        let mut report = SweepReport::default();

        let expired = match self.entries.expired_keys(now) {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!(error = %e, "skipping correlation sweep");
                return report;
            }
        };

        for correlation_id in expired {
            if !self.evict_if_expired(&correlation_id, now, &mut report) {
                tracing::trace!(correlation_id = %correlation_id, "expired entry already taken");
            }
        }

        if !report.evicted.is_empty() {
            tracing::debug!(
                evicted = report.evicted.len(),
                failed = report.failures.len(),
                "correlation sweep finished"
            );
        }
        report
    }

    /// Removes `correlation_id` if it is still expired, then notifies the listener and times out its handler.
    /// Returns `false` if a concurrent `remove` or `put` got to the entry first.
    fn evict_if_expired(&self, correlation_id: &str, now: Instant, report: &mut SweepReport) -> bool {
        let handler = match self.entries.evict_if_expired(correlation_id, now) {
            Ok(Some(handler)) => handler,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(correlation_id, error = %e, "failed to evict correlation id");
                return false;
            }
        };

        self.notify(ListenerHook::Eviction, correlation_id);
        report.evicted.push(correlation_id.to_string());

        // The entry is already gone, a failing handler is reported once and never retried
        if let Err(e) = guarded_timeout(handler.as_ref(), correlation_id) {
            tracing::warn!(correlation_id, error = %e, "reply handler failed on timeout");
            report.failures.push((correlation_id.to_string(), e));
        }
        true
    }

    /// Stops the recurring sweep, remaining entries are left untouched
    pub fn shutdown(&self) {
        let task = self
            .sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.cancel();
            tracing::debug!("correlation map sweep stopped");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, |task| task.is_cancelled())
    }

    fn listener(&self) -> Option<Arc<dyn CorrelationListener>> {
        self.listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn notify(&self, hook: ListenerHook, correlation_id: &str) {
        // Resolve first so no lock is held while the hook runs
        if let Some(listener) = self.listener() {
            guarded_notify(listener.as_ref(), hook, correlation_id);
        }
    }
}

impl Drop for CorrelationMap {
    /// `CorrelationMap` stops its sweep on drop
    fn drop(&mut self) {
        self.shutdown();
    }
}
