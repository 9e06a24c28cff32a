//! Observers for injector lookups.
//!
//! Observers are attached through [`InjectorBuilder::observer`] and notified
//! around every top-level lookup made through an [`Injector`]. Calls are
//! synchronous; keep implementations cheap.
//!
//! [`InjectorBuilder::observer`]: crate::InjectorBuilder::observer
//! [`Injector`]: crate::Injector

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::DiError;
use crate::key::Target;

/// Observer of injector lookups.
///
/// # Examples
///
/// ```
/// use ferrous_wire::{DiError, DiObserver, Injector, Target};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Failures(AtomicUsize);
///
/// impl DiObserver for Failures {
///     fn resolving(&self, _target: &Target) {}
///     fn resolved(&self, _target: &Target, _duration: Duration) {}
///     fn failed(&self, _target: &Target, _error: &DiError) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let failures = Arc::new(Failures::default());
/// let injector = Injector::builder().observer(failures.clone()).build().unwrap();
/// assert!(injector.get::<String>().is_err());
/// assert_eq!(failures.0.load(Ordering::SeqCst), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// A lookup is starting.
    fn resolving(&self, target: &Target);

    /// A lookup produced a value.
    fn resolved(&self, target: &Target, duration: Duration);

    /// A lookup failed.
    fn failed(&self, target: &Target, error: &DiError) {
        let _ = (target, error);
    }
}

/// Observers attached to one injector.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn resolving(&self, target: &Target) {
        for observer in &self.observers {
            observer.resolving(target);
        }
    }

    pub(crate) fn resolved(&self, target: &Target, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(target, duration);
        }
    }

    pub(crate) fn failed(&self, target: &Target, error: &DiError) {
        for observer in &self.observers {
            observer.failed(target, error);
        }
    }
}

/// Observer forwarding lookups to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiObserver for TracingObserver {
    fn resolving(&self, target: &Target) {
        trace!(target = %target, "resolving");
    }

    fn resolved(&self, target: &Target, duration: Duration) {
        trace!(target = %target, ?duration, "resolved");
    }

    fn failed(&self, target: &Target, error: &DiError) {
        debug!(target = %target, %error, "lookup failed");
    }
}

/// Observer counting lookups and their cumulative duration.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    resolution_count: AtomicU64,
    failure_count: AtomicU64,
    total_resolution_nanos: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution_count(&self) -> u64 {
        self.resolution_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn total_resolution_time(&self) -> Duration {
        Duration::from_nanos(self.total_resolution_nanos.load(Ordering::Relaxed))
    }

    /// Mean duration of successful lookups.
    pub fn average_resolution_time(&self) -> Option<Duration> {
        match self.resolution_count() {
            0 => None,
            count => Some(Duration::from_nanos(
                self.total_resolution_nanos.load(Ordering::Relaxed) / count,
            )),
        }
    }

    pub fn reset(&self) {
        self.resolution_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.total_resolution_nanos.store(0, Ordering::Relaxed);
    }
}

impl DiObserver for MetricsObserver {
    fn resolving(&self, _target: &Target) {}

    fn resolved(&self, _target: &Target, duration: Duration) {
        self.resolution_count.fetch_add(1, Ordering::Relaxed);
        self.total_resolution_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn failed(&self, _target: &Target, _error: &DiError) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_accumulate_and_reset() {
        let metrics = MetricsObserver::new();
        let target = Target::of::<u8>();
        assert_eq!(metrics.average_resolution_time(), None);

        metrics.resolved(&target, Duration::from_millis(2));
        metrics.resolved(&target, Duration::from_millis(4));
        metrics.failed(&target, &DiError::NoBindingFound("u8".into()));

        assert_eq!(metrics.resolution_count(), 2);
        assert_eq!(metrics.failure_count(), 1);
        assert_eq!(metrics.average_resolution_time(), Some(Duration::from_millis(3)));

        metrics.reset();
        assert_eq!(metrics.resolution_count(), 0);
        assert_eq!(metrics.total_resolution_time(), Duration::ZERO);
    }

    #[test]
    fn average_survives_counts_beyond_u32() {
        let metrics = MetricsObserver::new();
        metrics.resolution_count.store(1 << 32, Ordering::Relaxed);
        metrics.total_resolution_nanos.store(3 << 32, Ordering::Relaxed);
        assert_eq!(metrics.average_resolution_time(), Some(Duration::from_nanos(3)));
    }

    #[test]
    fn observers_fan_out() {
        let first = Arc::new(MetricsObserver::new());
        let second = Arc::new(MetricsObserver::new());
        let mut observers = Observers::default();
        assert!(!observers.has_observers());
        observers.add(first.clone());
        observers.add(second.clone());
        observers.resolved(&Target::of::<u8>(), Duration::from_nanos(10));
        assert_eq!(first.resolution_count(), 1);
        assert_eq!(second.resolution_count(), 1);
    }
}
