//! Scopes controlling instance caching behavior.
//!
//! A scope wraps an unscoped provider (one that builds a fresh value on every
//! call) into a scoped one. Scopes are ordinary injectable values: the root
//! module binds one instance of every built-in scope, and a binding refers to
//! its scope by type through a [`ScopeRef`].
//!
//! # Scope Characteristics
//!
//! - **PerLookupScope**: every `get()` builds a new value
//! - **SingletonScope**: first `get()` builds, later calls return the cache
//! - **ImmediateScope**: singleton built while the injector is being created
//! - **ThreadScope**: one value per calling thread
//! - **ContextScope**: one value per entered context block
//!
//! # Examples
//!
//! ```rust
//! use ferrous_wire::{Binder, DiResult, Injector, Module, PerLookupScope};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! static BUILT: AtomicUsize = AtomicUsize::new(0);
//!
//! struct Counter(usize);
//! impl ferrous_wire::Factory for Counter {
//!     type Output = usize;
//!     fn get(&self) -> DiResult<Arc<usize>> {
//!         Ok(Arc::new(BUILT.fetch_add(1, Ordering::SeqCst) + self.0))
//!     }
//! }
//!
//! struct App;
//! impl Module for App {
//!     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
//!         binder
//!             .bind::<usize>()
//!             .in_scope::<PerLookupScope>()
//!             .to_provider_instance(Counter(100))?;
//!         Ok(())
//!     }
//! }
//!
//! let injector = Injector::new(vec![Box::new(App)]).unwrap();
//! let a = injector.get::<usize>().unwrap();
//! let b = injector.get::<usize>().unwrap();
//! assert_ne!(*a, *b);
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::DiResult;
use crate::key::TypeInfo;
use crate::provider::{downcast, Provide, Provider, Value};

mod context;
mod thread;

pub use context::{ContextGuard, ContextScope};
pub use thread::ThreadScope;

/// Policy turning a per-construction provider into a per-lifetime provider.
pub trait Scope: Send + Sync + 'static {
    /// Wraps `unscoped` into a provider honouring this scope's lifetime.
    fn wrap(&self, unscoped: Provider) -> DiResult<Provider>;
}

/// Reference to a scope by type, stored in bindings.
///
/// The scope instance itself is resolved from the injector when the binding
/// is turned into a provider, so modules may rebind scope types.
#[derive(Clone, Copy)]
pub struct ScopeRef {
    info: TypeInfo,
    cast: fn(&Value) -> DiResult<Arc<dyn Scope>>,
}

fn cast_scope<S: Scope>(value: &Value) -> DiResult<Arc<dyn Scope>> {
    downcast::<S>(value).map(|scope| scope as Arc<dyn Scope>)
}

impl ScopeRef {
    pub fn of<S: Scope>() -> Self {
        Self {
            info: TypeInfo::of::<S>(),
            cast: cast_scope::<S>,
        }
    }

    pub fn singleton() -> Self {
        Self::of::<SingletonScope>()
    }

    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    /// Whether instances under this scope live as long as the injector.
    pub fn is_singleton_like(&self) -> bool {
        self.info == TypeInfo::of::<SingletonScope>() || self.info == TypeInfo::of::<ImmediateScope>()
    }

    pub(crate) fn cast(&self, value: &Value) -> DiResult<Arc<dyn Scope>> {
        (self.cast)(value)
    }
}

impl Default for ScopeRef {
    fn default() -> Self {
        Self::singleton()
    }
}

impl PartialEq for ScopeRef {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl Eq for ScopeRef {}

impl fmt::Debug for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeRef({})", self.info.simple_name())
    }
}

/// New value on every lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerLookupScope;

impl Scope for PerLookupScope {
    fn wrap(&self, unscoped: Provider) -> DiResult<Provider> {
        Ok(unscoped)
    }
}

/// One value per injector, built on first use.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingletonScope;

pub(crate) struct SingletonProvider {
    inner: Provider,
    cached: Mutex<Option<Value>>,
}

impl SingletonProvider {
    pub(crate) fn new(inner: Provider) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }
}

impl Provide for SingletonProvider {
    fn provide(&self) -> DiResult<Value> {
        let mut cached = self.cached.lock();
        if let Some(value) = cached.as_ref() {
            return Ok(value.clone());
        }
        let value = self.inner.get()?;
        *cached = Some(value.clone());
        Ok(value)
    }
}

impl Scope for SingletonScope {
    fn wrap(&self, unscoped: Provider) -> DiResult<Provider> {
        Ok(Provider::new(SingletonProvider::new(unscoped)))
    }
}

/// Singleton built as soon as its provider is created.
///
/// The injector creates a provider for every registered target while it is
/// being built, so immediate values exist before [`Injector::new`] returns.
///
/// [`Injector::new`]: crate::Injector::new
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScope;

impl Scope for ImmediateScope {
    fn wrap(&self, unscoped: Provider) -> DiResult<Provider> {
        let provider = Provider::new(SingletonProvider::new(unscoped));
        trace!("eagerly constructing immediate-scoped value");
        provider.get()?;
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::erase;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_provider(counter: Arc<AtomicUsize>) -> Provider {
        Provider::from_fn(move || Ok(erase(Arc::new(counter.fetch_add(1, Ordering::SeqCst)))))
    }

    #[test]
    fn per_lookup_rebuilds_every_time() {
        let counter = Arc::new(AtomicUsize::new(0));
        let provider = PerLookupScope.wrap(counting_provider(counter.clone())).unwrap();
        provider.get().unwrap();
        provider.get().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_builds_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let provider = SingletonScope.wrap(counting_provider(counter.clone())).unwrap();
        let a = downcast::<usize>(&provider.get().unwrap()).unwrap();
        let b = downcast::<usize>(&provider.get().unwrap()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn immediate_builds_at_wrap_time() {
        let counter = Arc::new(AtomicUsize::new(0));
        let provider = ImmediateScope.wrap(counting_provider(counter.clone())).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        provider.get().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn singleton_like_scopes() {
        assert!(ScopeRef::singleton().is_singleton_like());
        assert!(ScopeRef::of::<ImmediateScope>().is_singleton_like());
        assert!(!ScopeRef::of::<PerLookupScope>().is_singleton_like());
        assert_eq!(ScopeRef::default(), ScopeRef::of::<SingletonScope>());
    }
}
