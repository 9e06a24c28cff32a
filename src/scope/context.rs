use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use super::Scope;
use crate::error::DiResult;
use crate::provider::{Provide, Provider, Value};

type Slot = Arc<Mutex<Option<Value>>>;

#[derive(Default)]
struct ContextShared {
    depth: Mutex<usize>,
    slots: Mutex<Vec<Weak<Mutex<Option<Value>>>>>,
}

/// One value per entered context block.
///
/// Outside of an entered block every lookup builds a new value. Inside, the
/// first lookup caches; leaving the outermost block flushes the caches of
/// every provider wrapped by this scope instance.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{ContextScope, Scope, Provider};
/// use ferrous_wire::provider::{downcast, erase};
/// use std::sync::Arc;
///
/// let scope = ContextScope::new();
/// let provider = scope.wrap(Provider::from_fn(|| Ok(erase(Arc::new(1u8))))).unwrap();
///
/// let (a, b) = {
///     let _entered = scope.enter();
///     let a = downcast::<u8>(&provider.get().unwrap()).unwrap();
///     let b = downcast::<u8>(&provider.get().unwrap()).unwrap();
///     (a, b)
/// };
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let c = downcast::<u8>(&provider.get().unwrap()).unwrap();
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
#[derive(Clone, Default)]
pub struct ContextScope {
    shared: Arc<ContextShared>,
}

impl ContextScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a context block; the block ends when the guard is dropped.
    #[must_use = "the context is exited as soon as the guard is dropped"]
    pub fn enter(&self) -> ContextGuard {
        *self.shared.depth.lock() += 1;
        trace!("entered context scope");
        ContextGuard { scope: self.clone() }
    }

    pub fn is_active(&self) -> bool {
        *self.shared.depth.lock() > 0
    }

    fn exit(&self) {
        let remaining = {
            let mut depth = self.shared.depth.lock();
            *depth = depth.saturating_sub(1);
            *depth
        };
        if remaining == 0 {
            let mut slots = self.shared.slots.lock();
            slots.retain(|slot| match slot.upgrade() {
                Some(slot) => {
                    *slot.lock() = None;
                    true
                }
                None => false,
            });
            trace!(providers = slots.len(), "exited context scope, caches flushed");
        }
    }
}

impl fmt::Debug for ContextScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextScope")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Guard of an entered [`ContextScope`] block.
pub struct ContextGuard {
    scope: ContextScope,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.scope.exit();
    }
}

struct ContextScopedProvider {
    inner: Provider,
    slot: Slot,
    scope: ContextScope,
}

impl Provide for ContextScopedProvider {
    fn provide(&self) -> DiResult<Value> {
        if !self.scope.is_active() {
            return self.inner.get();
        }
        let mut slot = self.slot.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = self.inner.get()?;
        *slot = Some(value.clone());
        Ok(value)
    }
}

impl Scope for ContextScope {
    fn wrap(&self, unscoped: Provider) -> DiResult<Provider> {
        let slot: Slot = Arc::new(Mutex::new(None));
        self.shared.slots.lock().push(Arc::downgrade(&slot));
        Ok(Provider::new(ContextScopedProvider {
            inner: unscoped,
            slot,
            scope: self.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{downcast, erase};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(scope: &ContextScope, counter: Arc<AtomicUsize>) -> Provider {
        scope
            .wrap(Provider::from_fn(move || {
                Ok(erase(Arc::new(counter.fetch_add(1, Ordering::SeqCst))))
            }))
            .unwrap()
    }

    #[test]
    fn caches_only_while_entered() {
        let scope = ContextScope::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let provider = counting(&scope, counter.clone());

        provider.get().unwrap();
        provider.get().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        {
            let _guard = scope.enter();
            provider.get().unwrap();
            provider.get().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exit_flushes_every_wrapped_provider() {
        let scope = ContextScope::new();
        let first = counting(&scope, Arc::new(AtomicUsize::new(0)));
        let second = counting(&scope, Arc::new(AtomicUsize::new(10)));

        let before = {
            let _guard = scope.enter();
            (
                downcast::<usize>(&first.get().unwrap()).unwrap(),
                downcast::<usize>(&second.get().unwrap()).unwrap(),
            )
        };
        let after = {
            let _guard = scope.enter();
            (
                downcast::<usize>(&first.get().unwrap()).unwrap(),
                downcast::<usize>(&second.get().unwrap()).unwrap(),
            )
        };
        assert_eq!((*before.0, *before.1), (0, 10));
        assert_eq!((*after.0, *after.1), (1, 11));
    }

    #[test]
    fn nested_blocks_keep_cache_until_outermost_exit() {
        let scope = ContextScope::new();
        let provider = counting(&scope, Arc::new(AtomicUsize::new(0)));
        let outer = scope.enter();
        let a = downcast::<usize>(&provider.get().unwrap()).unwrap();
        {
            let _inner = scope.enter();
            let b = downcast::<usize>(&provider.get().unwrap()).unwrap();
            assert!(Arc::ptr_eq(&a, &b));
        }
        let c = downcast::<usize>(&provider.get().unwrap()).unwrap();
        assert!(Arc::ptr_eq(&a, &c));
        drop(outer);
        assert!(!scope.is_active());
    }
}
