use std::borrow::Cow;
use std::env;

use tracing::debug;

use super::{Binder, Module};
use crate::error::DiResult;

/// Configures a module only when an environment variable has a given value.
///
/// The variable is read when the module is configured. A disabled module
/// contributes no bindings.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{module, ConditionalModule, Injector};
/// use std::sync::Arc;
///
/// let debug_tools = ConditionalModule::new(
///     "FERROUS_WIRE_DOC_DEBUG_TOOLS",
///     "1",
///     module::from_fn("debug-tools", |binder| {
///         binder.bind::<bool>().named("debug").to_instance(Arc::new(true))?;
///         Ok(())
///     }),
/// );
///
/// let injector = Injector::new(vec![Box::new(debug_tools)]).unwrap();
/// assert!(injector.get_named::<bool>("debug").is_err());
/// ```
pub struct ConditionalModule<M> {
    variable: Cow<'static, str>,
    expected: Cow<'static, str>,
    inner: M,
}

impl<M: Module> ConditionalModule<M> {
    pub fn new(
        variable: impl Into<Cow<'static, str>>,
        expected: impl Into<Cow<'static, str>>,
        inner: M,
    ) -> Self {
        Self {
            variable: variable.into(),
            expected: expected.into(),
            inner,
        }
    }

    /// Whether the wrapped module would be installed right now.
    pub fn is_enabled(&self) -> bool {
        env::var(self.variable.as_ref())
            .map(|value| value == self.expected)
            .unwrap_or(false)
    }
}

impl<M: Module> Module for ConditionalModule<M> {
    fn configure(&self, binder: &mut Binder) -> DiResult<()> {
        if self.is_enabled() {
            self.inner.configure(binder)
        } else {
            debug!(module = %self.inner.name(), variable = %self.variable, "conditional module disabled");
            Ok(())
        }
    }

    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }

    fn is_private(&self) -> bool {
        self.inner.is_private()
    }
}
