use std::borrow::Cow;

use super::{Binder, Module};
use crate::error::DiResult;

/// Runs a module as a private module.
///
/// Bindings of the wrapped module are resolved in a child injection state of
/// their own. Only targets passed to [`Binder::expose`] or
/// [`Binder::expose_target`] are published to the installing module; the
/// rest stay visible to the module's own bindings only.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{module, DiError, Injector, PrivateModule};
/// use std::sync::Arc;
///
/// let secrets = PrivateModule::new(module::from_fn("secrets", |binder| {
///     binder.bind::<String>().to_instance(Arc::new("hunter2".to_string()))?;
///     let port = binder.bind::<u16>().to_instance(Arc::new(5432))?;
///     binder.expose(&port)
/// }));
///
/// let injector = Injector::new(vec![Box::new(secrets)]).unwrap();
/// assert_eq!(*injector.get::<u16>().unwrap(), 5432);
/// assert!(matches!(injector.get::<String>(), Err(DiError::NoBindingFound(_))));
/// ```
pub struct PrivateModule<M> {
    inner: M,
}

impl<M: Module> PrivateModule<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> M {
        self.inner
    }
}

impl<M: Module> Module for PrivateModule<M> {
    fn configure(&self, binder: &mut Binder) -> DiResult<()> {
        self.inner.configure(binder)
    }

    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }

    fn is_private(&self) -> bool {
        true
    }
}
