use crate::TimeoutKeyRequirements;
use std::{
    borrow::Borrow,
    collections::HashMap,
    hash::Hash,
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tokio::time::Instant;

type Registry<K, V> = HashMap<K, TimeoutEntry<V>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutMapError {
    #[error("timeout map lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<PoisonError<T>> for TimeoutMapError {
    fn from(err: PoisonError<T>) -> Self {
        TimeoutMapError::LockPoisoned(err.to_string())
    }
}

/// `Deadline` marks when a `TimeoutMap` entry becomes eligible for eviction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Deadline {
    At(Instant),
    /// Only removable explicitly
    Never,
}

impl Deadline {
    /// Converts a relative timeout in milliseconds, anything `<= 0` never expires
    pub fn from_millis(timeout_millis: i64, now: Instant) -> Self {
        match u64::try_from(timeout_millis) {
            Ok(0) | Err(_) => Deadline::Never,
            Ok(millis) => Self::after(Duration::from_millis(millis), now),
        }
    }

    /// Deadline `timeout` after `now`, a zero timeout never expires
    pub fn after(timeout: Duration, now: Instant) -> Self {
        if timeout.is_zero() {
            return Deadline::Never;
        }
        // Past the representable range is as good as never
        now.checked_add(timeout).map_or(Deadline::Never, Deadline::At)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Deadline::At(deadline) => *deadline <= now,
            Deadline::Never => false,
        }
    }
}

/// A value tracked by a `TimeoutMap` along with its `Deadline`
#[derive(Clone, Debug)]
struct TimeoutEntry<V> {
    value: V,
    deadline: Deadline,
}

impl<V> TimeoutEntry<V> {
    fn deadline(&self) -> Deadline {
        self.deadline
    }

    fn into_value(self) -> V {
        self.value
    }
}

/// `TimeoutMap` is a key-value container where every entry carries a `Deadline`.
/// It never evicts on its own, owners decide when to sweep with `expired_keys` and `evict_if_expired`.
/// `std::Mutex` is used as every operation is a short map mutation and no lock is held across an `await`.
pub struct TimeoutMap<K, V> {
    entries: Mutex<Registry<K, V>>,
}

impl<K: std::fmt::Debug, V> std::fmt::Debug for TimeoutMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.entries.lock() {
            Ok(entries) => f
                .debug_struct("TimeoutMap")
                .field("keys", &entries.keys().collect::<Vec<_>>())
                .finish(),
            Err(e) => f
                .debug_struct("TimeoutMap")
                .field("keys", &format!("<lock poisoned>: {e}"))
                .finish(),
        }
    }
}

impl<K: TimeoutKeyRequirements, V> Default for TimeoutMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TimeoutKeyRequirements, V> TimeoutMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or overwrites the entry for `key`, returning the value it replaced
    pub fn put(&self, key: K, value: V, deadline: Deadline) -> Result<Option<V>, TimeoutMapError> {
        Ok(self
            .entries
            .lock()?
            .insert(key, TimeoutEntry { value, deadline })
            .map(TimeoutEntry::into_value))
    }

    pub fn get<Q>(&self, key: &Q) -> Result<Option<V>, TimeoutMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        Ok(self
            .entries
            .lock()?
            .get(key)
            .map(|entry| entry.value.clone()))
    }

    pub fn deadline<Q>(&self, key: &Q) -> Result<Option<Deadline>, TimeoutMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Ok(self.entries.lock()?.get(key).map(TimeoutEntry::deadline))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> Result<bool, TimeoutMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Ok(self.entries.lock()?.contains_key(key))
    }

    /// Takes the entry for `key` out of the map regardless of its `Deadline`
    pub fn remove<Q>(&self, key: &Q) -> Result<Option<V>, TimeoutMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Ok(self
            .entries
            .lock()?
            .remove(key)
            .map(TimeoutEntry::into_value))
    }

    /// Snapshot of the keys whose `Deadline` has passed at `now`.
    /// The snapshot can go stale, callers must re-check with `evict_if_expired`.
    pub fn expired_keys(&self, now: Instant) -> Result<Vec<K>, TimeoutMapError> {
        Ok(self
            .entries
            .lock()?
            .iter()
            .filter(|(_, entry)| entry.deadline.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    /// Removes the entry for `key` only if it is still present and expired at `now`.
    /// The check and the removal happen under one lock, so a concurrent `remove` or `put` can never be lost.
    pub fn evict_if_expired<Q>(&self, key: &Q, now: Instant) -> Result<Option<V>, TimeoutMapError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.entries.lock()?;
        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.deadline.is_expired(now));
        if !expired {
            return Ok(None);
        }
        Ok(entries.remove(key).map(TimeoutEntry::into_value))
    }

    pub fn keys(&self) -> Result<Vec<K>, TimeoutMapError> {
        Ok(self.entries.lock()?.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize, TimeoutMapError> {
        Ok(self.entries.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, TimeoutMapError> {
        Ok(self.entries.lock()?.is_empty())
    }

    /// Drops every entry without evicting, returns how many were dropped
    pub fn clear(&self) -> Result<usize, TimeoutMapError> {
        let mut entries = self.entries.lock()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }
}
