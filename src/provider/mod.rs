//! Providers and the machinery that turns targets into providers.
//!
//! A [`Provider`] is a zero-argument producer of type-erased values. The
//! submodules build providers for targets: [`context`] tracks one resolution,
//! [`state`] holds the per-module registry and provider cache, [`factories`]
//! is the ordered provider-factory chain and [`adapters`] turns a registered
//! binding into a provider.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::TypeInfo;

pub(crate) mod adapters;
pub(crate) mod cache;
pub(crate) mod context;
pub(crate) mod factories;
pub(crate) mod state;

pub(crate) use context::InjectionContext;
pub(crate) use state::InjectionState;

/// Type-erased value produced by providers.
///
/// For a plain target `T` the payload is an `Arc<T>`.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Erases a typed instance into a [`Value`].
pub fn erase<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Value {
    Arc::new(instance)
}

/// Recovers a typed instance from a [`Value`] produced for a plain target.
pub fn downcast<T: ?Sized + Send + Sync + 'static>(value: &Value) -> DiResult<Arc<T>> {
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| DiError::TypeMismatch(std::any::type_name::<T>().to_string()))
}

/// Payload of list, set and tuple targets.
///
/// `distinct` marks set payloads: typed extraction drops repeated instances.
pub(crate) struct Collection {
    pub(crate) items: Vec<Value>,
    pub(crate) distinct: bool,
}

impl Collection {
    pub(crate) fn list(items: Vec<Value>) -> Value {
        Arc::new(Collection { items, distinct: false })
    }

    pub(crate) fn set(items: Vec<Value>) -> Value {
        Arc::new(Collection { items, distinct: true })
    }
}

/// Payload of an optional target whose element is not bound.
pub(crate) struct Absent;

pub(crate) fn collection_items(value: &Value, target: &str) -> DiResult<Vec<Value>> {
    value
        .downcast_ref::<Collection>()
        .map(|c| c.items.clone())
        .ok_or_else(|| DiError::TypeMismatch(target.to_string()))
}

pub(crate) fn downcast_all<T: ?Sized + Send + Sync + 'static>(items: &[Value]) -> DiResult<Vec<Arc<T>>> {
    items.iter().map(downcast::<T>).collect()
}

/// Typed items of a collection payload, deduplicated by identity for sets.
pub(crate) fn downcast_collection<T: ?Sized + Send + Sync + 'static>(
    value: &Value,
    target: &str,
) -> DiResult<Vec<Arc<T>>> {
    let collection = value
        .downcast_ref::<Collection>()
        .ok_or_else(|| DiError::TypeMismatch(target.to_string()))?;
    let mut items = downcast_all::<T>(&collection.items)?;
    if collection.distinct {
        let mut seen: Vec<Arc<T>> = Vec::with_capacity(items.len());
        items.retain(|item| {
            if seen.iter().any(|s| Arc::ptr_eq(s, item)) {
                false
            } else {
                seen.push(item.clone());
                true
            }
        });
    }
    Ok(items)
}

pub(crate) fn downcast_optional<T: ?Sized + Send + Sync + 'static>(value: &Value) -> DiResult<Option<Arc<T>>> {
    if value.is::<Absent>() {
        Ok(None)
    } else {
        downcast::<T>(value).map(Some)
    }
}

pub(crate) fn downcast_type(value: &Value) -> DiResult<TypeInfo> {
    value
        .downcast_ref::<TypeInfo>()
        .copied()
        .ok_or_else(|| DiError::TypeMismatch("TypeInfo".to_string()))
}

pub(crate) fn downcast_provider<T: ?Sized + Send + Sync + 'static>(value: &Value) -> DiResult<ProviderOf<T>> {
    value
        .downcast_ref::<Provider>()
        .cloned()
        .map(ProviderOf::new)
        .ok_or_else(|| DiError::TypeMismatch(format!("ProviderOf<{}>", std::any::type_name::<T>())))
}

/// Core provider trait: one synchronous operation yielding a value.
pub trait Provide: Send + Sync {
    fn provide(&self) -> DiResult<Value>;
}

impl<F> Provide for F
where
    F: Fn() -> DiResult<Value> + Send + Sync,
{
    fn provide(&self) -> DiResult<Value> {
        self()
    }
}

/// Shared, cloneable handle to a provider.
///
/// Cloning shares the provider; [`Provider::ptr_eq`] tells whether two
/// handles are the same provider object.
#[derive(Clone)]
pub struct Provider {
    inner: Arc<dyn Provide>,
}

impl Provider {
    pub fn new<P: Provide + 'static>(provide: P) -> Self {
        Self { inner: Arc::new(provide) }
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> DiResult<Value> + Send + Sync + 'static,
    {
        Self::new(f)
    }

    /// Provider always returning the same value.
    pub fn constant(value: Value) -> Self {
        Self::from_fn(move || Ok(value.clone()))
    }

    /// Produces one value.
    pub fn get(&self) -> DiResult<Value> {
        self.inner.provide()
    }

    pub fn ptr_eq(&self, other: &Provider) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// Typed view of a provider, handed out for provider-of targets.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Binder, DiResult, Injector, Module};
/// use std::sync::Arc;
///
/// struct Settings;
/// impl Module for Settings {
///     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
///         binder.bind::<u32>().to_instance(Arc::new(7))?;
///         Ok(())
///     }
/// }
///
/// let injector = Injector::new(vec![Box::new(Settings)]).unwrap();
/// let provider = injector.get_provider::<u32>().unwrap();
/// assert_eq!(*provider.get().unwrap(), 7);
/// ```
pub struct ProviderOf<T: ?Sized> {
    provider: Provider,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ProviderOf<T> {
    pub(crate) fn new(provider: Provider) -> Self {
        Self {
            provider,
            _marker: PhantomData,
        }
    }

    /// Produces one instance, honouring the scope of the underlying binding.
    pub fn get(&self) -> DiResult<Arc<T>> {
        downcast::<T>(&self.provider.get()?)
    }

    /// Produces one instance of a provider declared over `Optional<T>`.
    pub fn get_optional(&self) -> DiResult<Option<Arc<T>>> {
        downcast_optional::<T>(&self.provider.get()?)
    }

    /// The untyped provider.
    pub fn erased(&self) -> &Provider {
        &self.provider
    }
}

impl<T: ?Sized> Clone for ProviderOf<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ProviderOf<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderOf").field(&self.provider).finish()
    }
}
