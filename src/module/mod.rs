//! Modules: configurable sources of bindings.
//!
//! A [`Module`] declares bindings through a [`Binder`]. Modules are
//! configured at most once, installed into each other to compose larger
//! registries, and may be private, in which case only the targets they
//! expose are visible to the installing module.
//!
//! # Example
//!
//! ```rust
//! use ferrous_wire::{Arguments, Binder, DiResult, Injectable, Injector, Module, Signature};
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: Arc<String>,
//! }
//!
//! impl Injectable for Config {
//!     fn signature() -> Signature {
//!         Signature::of::<Self>().param::<String>("url")
//!     }
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(Config { url: args.get("url")? })
//!     }
//! }
//!
//! struct ConfigModule;
//! impl Module for ConfigModule {
//!     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
//!         binder.bind::<String>().to_instance(Arc::new("sqlite://memory".to_string()))?;
//!         binder.bind::<Config>().to_self()?;
//!         Ok(())
//!     }
//! }
//!
//! struct AppModule;
//! impl Module for AppModule {
//!     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
//!         binder.install(ConfigModule)
//!     }
//! }
//!
//! # fn main() -> DiResult<()> {
//! let injector = Injector::new(vec![Box::new(AppModule)])?;
//! assert_eq!(*injector.get::<Config>()?.url, "sqlite://memory");
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexSet;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::binding::{
    caster, invoker, AliasBinding, Binding, Factory, FactorySource, InstanceBinding, ItemBinding, MultiBinding,
    PrivateModuleRef, ProviderBinding, RegisteredBinding, SelfBinding,
};
use crate::error::{DiError, DiResult};
use crate::key::{Target, TargetType, TypeInfo};
use crate::provider::erase;
use crate::registration::BindingRegistry;
use crate::scope::{Scope, ScopeRef};
use crate::signature::{Constructor, Injectable};

mod conditional;
mod private;

pub use conditional::ConditionalModule;
pub use private::PrivateModule;

/// A configurable source of bindings.
pub trait Module: Send + Sync + 'static {
    /// Declares this module's bindings.
    fn configure(&self, binder: &mut Binder) -> DiResult<()>;

    /// Name used in diagnostics and binding error source paths.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Private modules publish only the targets they expose.
    fn is_private(&self) -> bool {
        false
    }
}

/// Module declared by a closure.
///
/// ```rust
/// use ferrous_wire::{module, Injector};
/// use std::sync::Arc;
///
/// let settings = module::from_fn("settings", |binder| {
///     binder.bind::<u16>().named("port").to_instance(Arc::new(8080))?;
///     Ok(())
/// });
/// let injector = Injector::new(vec![Box::new(settings)]).unwrap();
/// assert_eq!(*injector.get_named::<u16>("port").unwrap(), 8080);
/// ```
pub struct FnModule<F> {
    name: Cow<'static, str>,
    configure: F,
}

pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, configure: F) -> FnModule<F>
where
    F: Fn(&mut Binder) -> DiResult<()> + Send + Sync + 'static,
{
    FnModule {
        name: name.into(),
        configure,
    }
}

impl<F> Module for FnModule<F>
where
    F: Fn(&mut Binder) -> DiResult<()> + Send + Sync + 'static,
{
    fn configure(&self, binder: &mut Binder) -> DiResult<()> {
        (self.configure)(binder)
    }

    fn name(&self) -> Cow<'static, str> {
        self.name.clone()
    }
}

/// Result of configuring a module once.
pub(crate) struct Configured {
    pub(crate) registry: Arc<BindingRegistry>,
    pub(crate) exposed: IndexSet<Target>,
    pub(crate) private: Option<PrivateModuleRef>,
}

struct HandleInner {
    module: Box<dyn Module>,
    configured: OnceCell<Configured>,
}

/// Shared handle to a module that configures it at most once.
///
/// Installing the same handle in several places reuses the bindings of the
/// first configuration.
///
/// ```rust
/// use ferrous_wire::{module, Injector, ModuleHandle};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// static CONFIGURED: AtomicUsize = AtomicUsize::new(0);
///
/// let shared = ModuleHandle::new(module::from_fn("shared", |binder| {
///     CONFIGURED.fetch_add(1, Ordering::SeqCst);
///     binder.bind::<u8>().to_instance(Arc::new(1))?;
///     Ok(())
/// }));
/// let (a, b) = (shared.clone(), shared.clone());
/// let root = module::from_fn("root", move |binder| {
///     binder.install_handle(&a)?;
///     binder.install_handle(&b)
/// });
/// Injector::new(vec![Box::new(root)]).unwrap();
/// assert_eq!(CONFIGURED.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct ModuleHandle {
    inner: Arc<HandleInner>,
}

impl ModuleHandle {
    pub fn new<M: Module>(module: M) -> Self {
        Self::from_boxed(Box::new(module))
    }

    pub fn from_boxed(module: Box<dyn Module>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                module,
                configured: OnceCell::new(),
            }),
        }
    }

    pub fn name(&self) -> Cow<'static, str> {
        self.inner.module.name()
    }

    pub fn is_private(&self) -> bool {
        self.inner.module.is_private()
    }

    /// Whether `configure` has already run.
    pub fn is_configured(&self) -> bool {
        self.inner.configured.get().is_some()
    }

    pub(crate) fn configure_once(&self) -> DiResult<&Configured> {
        self.inner.configured.get_or_try_init(|| {
            let module = &self.inner.module;
            let name = module.name();
            let mut binder = Binder::new(name.clone(), module.is_private());
            module
                .configure(&mut binder)
                .map_err(|err| err.within_module(&name))?;
            debug!(module = %name, bindings = binder.registry.len(), "configured module");
            let registry = Arc::new(binder.registry);
            let private = module
                .is_private()
                .then(|| PrivateModuleRef::new(name.to_string(), registry.clone()));
            Ok(Configured {
                registry,
                exposed: binder.exposed,
                private,
            })
        })
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name())
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// Collects the bindings of one module while it is configured.
pub struct Binder {
    registry: BindingRegistry,
    module_name: Cow<'static, str>,
    private: bool,
    exposed: IndexSet<Target>,
}

impl Binder {
    pub(crate) fn new(module_name: Cow<'static, str>, private: bool) -> Self {
        Self {
            registry: BindingRegistry::new(),
            module_name,
            private,
            exposed: IndexSet::new(),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Starts a binding for target type `T`.
    pub fn bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> BindingBuilder<'_, T> {
        BindingBuilder {
            binder: self,
            scope: ScopeRef::singleton(),
            name: None,
            _marker: PhantomData,
        }
    }

    /// Starts an unregistered item for a multi binding of `T`.
    pub fn bind_item<T: ?Sized + Send + Sync + 'static>(&self) -> ItemBuilder<T> {
        ItemBuilder { _marker: PhantomData }
    }

    /// Starts a multi binding at `List<T>`.
    pub fn multi_bind<T: ?Sized + Send + Sync + 'static>(&mut self) -> MultiBindingBuilder<'_, T> {
        MultiBindingBuilder {
            binder: self,
            scope: ScopeRef::singleton(),
            name: None,
            override_bindings: false,
            _marker: PhantomData,
        }
    }

    /// Configures `module` and merges its published bindings into this one.
    pub fn install<M: Module>(&mut self, module: M) -> DiResult<()> {
        self.install_handle(&ModuleHandle::new(module))
    }

    /// Installs a shared module handle; the module is configured only once.
    pub fn install_handle(&mut self, handle: &ModuleHandle) -> DiResult<()> {
        let configured = handle.configure_once()?;
        match &configured.private {
            Some(private) => {
                for target in &configured.exposed {
                    if !configured.registry.contains(target) {
                        warn!(module = %handle.name(), target = %target, "exposed target is not bound");
                    }
                }
                for registered in configured.registry.all() {
                    if configured.exposed.contains(&registered.target()) {
                        self.registry.register(registered.with_prefix(private), false);
                    }
                }
            }
            None => {
                for registered in configured.registry.all() {
                    self.registry.register(registered.clone(), false);
                }
            }
        }
        debug!(module = %handle.name(), into = %self.module_name, "installed module");
        Ok(())
    }

    /// Makes a binding of this private module visible to installers.
    pub fn expose(&mut self, registered: &RegisteredBinding) -> DiResult<()> {
        self.expose_target(registered.target())
    }

    /// Makes a target of this private module visible to installers.
    pub fn expose_target(&mut self, target: Target) -> DiResult<()> {
        if !self.private {
            return Err(DiError::binding(format!(
                "cannot expose {} from public module {}",
                target, self.module_name
            )));
        }
        self.exposed.insert(target);
        Ok(())
    }

    /// Registers an already built binding.
    pub(crate) fn register(&mut self, binding: Binding) -> RegisteredBinding {
        let registered = RegisteredBinding::new(binding);
        self.registry.register(registered.clone(), true);
        registered
    }

    pub(crate) fn into_registry(self) -> BindingRegistry {
        self.registry
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("module", &self.module_name)
            .field("private", &self.private)
            .field("bindings", &self.registry.len())
            .finish()
    }
}

/// Builder for one binding at `T`.
///
/// Scope and name are optional; the terminal method picks the recipe.
#[must_use = "a binding is registered only by a terminal method such as `to_instance`"]
pub struct BindingBuilder<'b, T: ?Sized> {
    binder: &'b mut Binder,
    scope: ScopeRef,
    name: Option<Cow<'static, str>>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<'b, T: ?Sized + Send + Sync + 'static> BindingBuilder<'b, T> {
    pub fn in_scope<S: Scope>(mut self) -> Self {
        self.scope = ScopeRef::of::<S>();
        self
    }

    pub fn scope(mut self, scope: ScopeRef) -> Self {
        self.scope = scope;
        self
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Binds a caller-supplied value. The scope must be singleton-like.
    pub fn to_instance(self, instance: Arc<T>) -> DiResult<RegisteredBinding> {
        let binding = Binding::Instance(InstanceBinding {
            target: TypeInfo::of::<T>(),
            instance: erase(instance),
            scope: self.scope,
            name: self.name,
        });
        Ok(self.binder.register(binding))
    }

    /// Binds `T` to a value built from `C`'s constructor.
    ///
    /// `cast` turns the built value into `T`, typically an unsizing coercion
    /// such as `|c| c as Arc<dyn Trait>`.
    pub fn to_class<C, F>(self, cast: F) -> DiResult<RegisteredBinding>
    where
        C: Injectable,
        F: Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static,
    {
        let target = TypeInfo::of::<T>();
        let bound = TypeInfo::constructible::<C>();
        if target == bound {
            return Err(DiError::binding(format!(
                "cannot bind {} to itself as a class; use to_self",
                target
            )));
        }
        let binding = Binding::Alias(AliasBinding {
            target,
            bound,
            bound_constructor: Constructor::of::<C>(),
            cast: caster(cast),
            scope: self.scope,
            name: self.name,
        });
        Ok(self.binder.register(binding))
    }

    /// Binds `T` to a factory type the container builds.
    pub fn to_provider<P>(self) -> DiResult<RegisteredBinding>
    where
        P: Factory<Output = T> + Injectable,
    {
        let binding = Binding::Provider(ProviderBinding {
            target: TypeInfo::of::<T>(),
            source: FactorySource::Class {
                factory: TypeInfo::constructible::<P>(),
                constructor: Constructor::of::<P>(),
            },
            invoke: invoker::<P>(),
            scope: self.scope,
            name: self.name,
        });
        Ok(self.binder.register(binding))
    }

    /// Binds `T` to a caller-supplied factory.
    pub fn to_provider_instance<P>(self, factory: P) -> DiResult<RegisteredBinding>
    where
        P: Factory<Output = T>,
    {
        let binding = Binding::Provider(ProviderBinding {
            target: TypeInfo::of::<T>(),
            source: FactorySource::Instance {
                factory: TypeInfo::of::<P>(),
                instance: erase(Arc::new(factory)),
            },
            invoke: invoker::<P>(),
            scope: self.scope,
            name: self.name,
        });
        Ok(self.binder.register(binding))
    }
}

impl<'b, T: Injectable> BindingBuilder<'b, T> {
    /// Binds `T` to its own constructor.
    pub fn to_self(self) -> DiResult<RegisteredBinding> {
        let binding = Binding::SelfBinding(SelfBinding::of::<T>(self.scope, self.name));
        Ok(self.binder.register(binding))
    }
}

/// Builder for an unregistered multi binding item producing `T`.
pub struct ItemBuilder<T: ?Sized> {
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ItemBuilder<T> {
    pub fn to_instance(self, instance: Arc<T>) -> ItemBinding {
        ItemBinding::instance(instance)
    }

    pub fn to_class<C, F>(self, cast: F) -> ItemBinding
    where
        C: Injectable,
        F: Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static,
    {
        ItemBinding::class_as::<C, T, F>(cast)
    }

    pub fn to_provider<P>(self) -> ItemBinding
    where
        P: Factory<Output = T> + Injectable,
    {
        ItemBinding::provider::<P>()
    }

    pub fn to_provider_instance<P>(self, factory: P) -> ItemBinding
    where
        P: Factory<Output = T>,
    {
        ItemBinding::provider_instance(factory)
    }
}

impl<T: Injectable> ItemBuilder<T> {
    pub fn to_self(self) -> ItemBinding {
        ItemBinding::class::<T>()
    }
}

/// Builder for a multi binding at `List<T>`.
#[must_use = "the multi binding is registered only by `to_items`"]
pub struct MultiBindingBuilder<'b, T: ?Sized> {
    binder: &'b mut Binder,
    scope: ScopeRef,
    name: Option<Cow<'static, str>>,
    override_bindings: bool,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<'b, T: ?Sized + Send + Sync + 'static> MultiBindingBuilder<'b, T> {
    pub fn in_scope<S: Scope>(mut self) -> Self {
        self.scope = ScopeRef::of::<S>();
        self
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace earlier items for the same target instead of appending.
    pub fn overriding(mut self) -> Self {
        self.override_bindings = true;
        self
    }

    /// Registers the items, in order.
    pub fn to_items(self, items: Vec<ItemBinding>) -> DiResult<RegisteredBinding> {
        let item_type = TypeInfo::of::<T>();
        let mut registered_items = Vec::with_capacity(items.len());
        for item in &items {
            let binding = item.to_binding()?;
            match item.output_type() {
                Some(output) if output == item_type => {}
                other => {
                    return Err(DiError::binding(format!(
                        "item producing {} cannot be bound in a multi binding of {}",
                        other.map(|o| o.name()).unwrap_or("nothing"),
                        item_type
                    )))
                }
            }
            registered_items.push(RegisteredBinding::new(binding));
        }
        let binding = Binding::Multi(MultiBinding {
            item_target: TargetType::Type(item_type),
            item_bindings: items,
            registered_items,
            scope: self.scope,
            name: self.name,
            override_bindings: self.override_bindings,
        });
        Ok(self.binder.register(binding))
    }
}
