//! Recompute-on-demand memoization with tick-bound or time-bound staleness.
//!
//! A [`CachedValue`] owns a producer closure and the last value it produced.
//! [`CachedValue::get_value`] only re-runs the producer when the entry is
//! stale under its [`CachePolicy`] or after [`CachedValue::force_refresh`].
//!
//! # Concurrency
//!
//! The producer runs while the entry's mutex is held: concurrent callers block
//! until the in-flight computation finishes and then observe its result, so a
//! producer never runs twice in parallel for the same entry.
//!
//! # Failure
//!
//! A producer error is logged and leaves the previous value (or `T::default()`
//! if nothing was ever computed) in place. The entry stays stale, so the next
//! call retries. `parking_lot` mutexes do not poison, and the stored value is
//! only replaced after a successful run, so a panicking producer cannot
//! corrupt the entry either.
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::state::Tick;

/// Error type producers may return.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync>;

type Producer<T> = Box<dyn FnMut() -> Result<T, ProducerError> + Send>;

/// When a cached value goes stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachePolicy {
    /// Recompute at most once per simulation tick.
    PerTick,
    /// Recompute once the given duration has elapsed since the last computation.
    Every(Duration),
}

struct Entry<T> {
    value: T,
    computed_tick: Option<Tick>,
    computed_at: Option<Instant>,
    dirty: bool,
    producer: Producer<T>,
}

/// A memoized value bound to its producer and invalidation policy.
pub struct CachedValue<T> {
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    entry: Mutex<Entry<T>>,
}

impl<T> CachedValue<T>
where
    T: Clone + Default,
{
    /// Creates an entry around a fallible producer.
    pub fn new<F, E>(policy: CachePolicy, clock: Arc<dyn Clock>, mut producer: F) -> Self
    where
        F: FnMut() -> Result<T, E> + Send + 'static,
        E: Into<ProducerError>,
    {
        Self {
            policy,
            clock,
            entry: Mutex::new(Entry {
                value: T::default(),
                computed_tick: None,
                computed_at: None,
                dirty: true,
                producer: Box::new(move || producer().map_err(Into::into)),
            }),
        }
    }

    /// Creates an entry around an infallible producer.
    pub fn from_fn<F>(policy: CachePolicy, clock: Arc<dyn Clock>, mut producer: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self::new(policy, clock, move || Ok::<T, ProducerError>(producer()))
    }

    /// Tick-bound entry with an infallible producer.
    pub fn per_tick<F>(clock: Arc<dyn Clock>, producer: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self::from_fn(CachePolicy::PerTick, clock, producer)
    }

    /// Time-bound entry with an infallible producer.
    pub fn every<F>(interval: Duration, clock: Arc<dyn Clock>, producer: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        Self::from_fn(CachePolicy::Every(interval), clock, producer)
    }

    /// Returns the memoized value, recomputing it first if it is stale.
    pub fn get_value(&self) -> T {
        let mut entry = self.entry.lock();
        let tick = self.clock.tick();
        let now = self.clock.now();

        if !self.is_stale(&entry, tick, now) {
            return entry.value.clone();
        }

        match (entry.producer)() {
            Ok(value) => {
                entry.value = value;
                entry.computed_tick = Some(tick);
                entry.computed_at = Some(now);
                entry.dirty = false;
            }
            Err(error) => {
                tracing::warn!(
                    target: "pickup::cache",
                    policy = ?self.policy,
                    %error,
                    "cache producer failed, keeping previous value"
                );
            }
        }

        entry.value.clone()
    }

    /// Marks the entry stale; the next [`Self::get_value`] recomputes.
    pub fn force_refresh(&self) {
        self.entry.lock().dirty = true;
    }

    /// Last stored value without triggering a recompute.
    pub fn peek(&self) -> T {
        self.entry.lock().value.clone()
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    fn is_stale(&self, entry: &Entry<T>, tick: Tick, now: Instant) -> bool {
        if entry.dirty {
            return true;
        }
        match self.policy {
            CachePolicy::PerTick => entry.computed_tick != Some(tick),
            CachePolicy::Every(interval) => match entry.computed_at {
                Some(at) => now.saturating_duration_since(at) >= interval,
                None => true,
            },
        }
    }
}

impl<T> fmt::Debug for CachedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedValue")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_cache(
        policy: CachePolicy,
        clock: Arc<ManualClock>,
    ) -> (CachedValue<Arc<Vec<usize>>>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let cache = CachedValue::from_fn(policy, clock, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Arc::new(vec![n])
        });
        (cache, runs)
    }

    #[test]
    fn per_tick_computes_once_within_a_tick() {
        let clock = Arc::new(ManualClock::new());
        let (cache, runs) = counting_cache(CachePolicy::PerTick, Arc::clone(&clock));

        let first = cache.get_value();
        let second = cache.get_value();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn per_tick_recomputes_on_next_tick() {
        let clock = Arc::new(ManualClock::new());
        let (cache, runs) = counting_cache(CachePolicy::PerTick, Arc::clone(&clock));

        let first = cache.get_value();
        clock.advance_tick();
        let second = cache.get_value();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn time_bound_waits_for_interval() {
        let clock = Arc::new(ManualClock::new());
        let (cache, runs) = counting_cache(
            CachePolicy::Every(Duration::from_millis(100)),
            Arc::clone(&clock),
        );

        cache.get_value();
        clock.advance(Duration::from_millis(60));
        clock.advance_tick();
        cache.get_value();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(40));
        let value = cache.get_value();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(*value, vec![2]);
    }

    #[test]
    fn force_refresh_overrides_policy() {
        let clock = Arc::new(ManualClock::new());
        let (cache, runs) = counting_cache(
            CachePolicy::Every(Duration::from_secs(60)),
            Arc::clone(&clock),
        );

        cache.get_value();
        cache.force_refresh();
        cache.get_value();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_producer_keeps_previous_value_and_retries() {
        let clock = Arc::new(ManualClock::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = CachedValue::new(CachePolicy::PerTick, clock.clone(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                Err("world unavailable")
            } else {
                Ok(n as u32 + 10)
            }
        });

        assert_eq!(cache.get_value(), 10);

        clock.advance_tick();
        assert_eq!(cache.get_value(), 10, "failure keeps the previous value");

        // Still stale after the failure, so the same tick retries.
        assert_eq!(cache.get_value(), 12);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failure_before_first_success_yields_default() {
        let clock = Arc::new(ManualClock::new());
        let cache: CachedValue<Vec<u8>> =
            CachedValue::new(CachePolicy::PerTick, clock, || Err("not ready"));

        assert!(cache.get_value().is_empty());
    }

    #[test]
    fn concurrent_callers_share_one_computation() {
        let clock = Arc::new(ManualClock::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let cache = Arc::new(CachedValue::from_fn(CachePolicy::PerTick, clock, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            7u32
        }));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_value())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
