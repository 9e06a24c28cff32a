//! The injector: configured modules turned into a resolvable object graph.
//!
//! Building an injector configures its modules into a root registry, binds
//! the built-in scopes and the injector itself, then creates a provider for
//! every registered target so wiring errors surface before the first lookup.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use tracing::{debug, info};

use crate::binding::{
    invoker, Binding, Factory, FactorySource, PrivateModuleRef, ProviderBinding, RegisteredBinding,
};
use crate::config::InjectorOptions;
use crate::error::{DiError, DiResult};
use crate::key::{Target, TargetType, TypeInfo};
use crate::module::{self, Binder, Module, ModuleHandle};
use crate::observer::{DiObserver, Observers};
use crate::provider::factories::provider_for;
use crate::provider::{
    downcast, downcast_collection, downcast_optional, downcast_provider, downcast_type, erase, InjectionContext,
    InjectionState, Provider, ProviderOf, Value,
};
use crate::scope::{ContextScope, ImmediateScope, PerLookupScope, ScopeRef, SingletonScope, ThreadScope};
use crate::signature::Injectable;

/// Resolves targets from a set of configured modules.
///
/// Cloning is cheap and shares the same providers and scoped instances.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Arguments, Binder, DiResult, Injectable, Injector, Module, Signature};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English {
///     name: Arc<String>,
/// }
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         format!("hello, {}", self.name)
///     }
/// }
///
/// impl Injectable for English {
///     fn signature() -> Signature {
///         Signature::of::<Self>().param::<String>("name")
///     }
///     fn construct(args: &Arguments) -> DiResult<Self> {
///         Ok(English { name: args.get("name")? })
///     }
/// }
///
/// struct App;
/// impl Module for App {
///     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
///         binder.bind::<String>().to_instance(Arc::new("world".to_string()))?;
///         binder.bind::<dyn Greeter>().to_class::<English, _>(|e| e as Arc<dyn Greeter>)?;
///         Ok(())
///     }
/// }
///
/// let injector = Injector::new(vec![Box::new(App)]).unwrap();
/// assert_eq!(injector.get::<dyn Greeter>().unwrap().greet(), "hello, world");
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

struct InjectorInner {
    state: Arc<InjectionState>,
    observers: Observers,
}

impl Injector {
    /// Builds an injector from modules with default options.
    pub fn new(modules: Vec<Box<dyn Module>>) -> DiResult<Self> {
        Self::builder().modules(modules).build()
    }

    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    /// Value bound at `T`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(&self.get_target(&Target::of::<T>())?)
    }

    /// Value bound at `T` under `name`.
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        let target = Target::named_of::<T>(name.to_owned());
        downcast::<T>(&self.get_target(&target)?)
    }

    /// Every value bound for `T`, in declaration order.
    pub fn get_list<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.collection::<T>(Target::new(TargetType::list_of::<T>()))
    }

    /// Every value bound for `T`, each instance once.
    pub fn get_set<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.collection::<T>(Target::new(TargetType::set_of::<T>()))
    }

    /// Every value bound for `T` as a fixed-size slice.
    pub fn get_tuple<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<[Arc<T>]>> {
        self.collection::<T>(Target::new(TargetType::tuple_of::<T>()))
            .map(Arc::from)
    }

    /// The value bound at `T`, or `None` when nothing is bound.
    pub fn get_optional<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        downcast_optional::<T>(&self.get_target(&Target::new(TargetType::optional_of::<T>()))?)
    }

    /// The concrete type constructed for `T`.
    pub fn get_type<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<TypeInfo> {
        downcast_type(&self.get_target(&Target::new(TargetType::type_of::<T>()))?)
    }

    /// A provider of `T`. Fails now if `T` cannot be provided.
    pub fn get_provider<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<ProviderOf<T>> {
        self.provider(&Target::of::<T>())?;
        downcast_provider::<T>(&self.get_target(&Target::new(TargetType::provider_of::<T>()))?)
    }

    /// Value of an injectable type, built just in time when it is unbound
    /// and auto-bindings are enabled.
    pub fn get_constructible<T: Injectable>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(&self.get_target(&Target::new(TargetType::constructible::<T>()))?)
    }

    /// Type-erased value of any target.
    pub fn get_target(&self, target: &Target) -> DiResult<Value> {
        let observers = &self.inner.observers;
        if !observers.has_observers() {
            return self.resolve(target);
        }
        observers.resolving(target);
        let start = Instant::now();
        let result = self.resolve(target);
        match &result {
            Ok(_) => observers.resolved(target, start.elapsed()),
            Err(err) => observers.failed(target, err),
        }
        result
    }

    /// Value of the type registered under the unqualified name `name`.
    ///
    /// Fails when several registered types share that name.
    pub fn get_by_name(&self, name: &str) -> DiResult<Value> {
        self.get_target(&Target::new(TargetType::by_name(name.to_owned())))
    }

    /// The provider of a target, created if needed.
    pub fn provider(&self, target: &Target) -> DiResult<Provider> {
        provider_for(&self.context(target))
    }

    /// Targets registered at the root, in registration order.
    pub fn registered_targets(&self) -> Vec<Target> {
        self.inner.state.registry().targets().cloned().collect()
    }

    pub fn options(&self) -> &InjectorOptions {
        self.inner.state.options()
    }

    fn collection<T: ?Sized + Send + Sync + 'static>(&self, target: Target) -> DiResult<Vec<Arc<T>>> {
        let value = self.get_target(&target)?;
        downcast_collection::<T>(&value, &target.to_string())
    }

    fn context(&self, target: &Target) -> InjectionContext<'static> {
        InjectionContext::new(target.clone(), self.inner.state.clone())
    }

    fn resolve(&self, target: &Target) -> DiResult<Value> {
        self.provider(target)?.get()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("state", &self.inner.state)
            .field("observers", &self.inner.observers.has_observers())
            .finish()
    }
}

/// Creates a provider for every target bound in `state`, then descends into
/// the private states those bindings are routed through.
fn realize(state: &Arc<InjectionState>) -> DiResult<usize> {
    let mut realized = 0;
    let mut modules = Vec::new();
    for registered in state.registry().all() {
        provider_for(&InjectionContext::new(registered.target(), state.clone()))?;
        realized += 1;
        collect_modules(registered, &mut modules);
    }
    for module in modules {
        realized += realize(&state.private_state(&module))?;
    }
    Ok(realized)
}

fn collect_modules(registered: &RegisteredBinding, modules: &mut Vec<PrivateModuleRef>) {
    match registered.binding() {
        Binding::Multi(multi) => {
            for item in multi.registered_items() {
                collect_modules(item, modules);
            }
        }
        _ => {
            if let Some(first) = registered.source_path().first() {
                if !modules.contains(first) {
                    modules.push(first.clone());
                }
            }
        }
    }
}

/// Hands out the injector that owns it.
struct InjectorFactory {
    injector: Weak<InjectorInner>,
}

impl Factory for InjectorFactory {
    type Output = Injector;

    fn get(&self) -> DiResult<Arc<Injector>> {
        self.injector
            .upgrade()
            .map(|inner| Arc::new(Injector { inner }))
            .ok_or_else(|| DiError::non_injectable(Target::of::<Injector>(), "the injector has been dropped"))
    }
}

fn injector_binding(injector: Weak<InjectorInner>) -> Binding {
    Binding::Provider(ProviderBinding {
        target: TypeInfo::of::<Injector>(),
        source: FactorySource::Instance {
            factory: TypeInfo::of::<InjectorFactory>(),
            instance: erase(Arc::new(InjectorFactory { injector })),
        },
        invoke: invoker::<InjectorFactory>(),
        // A cached injector would keep its own state alive.
        scope: ScopeRef::of::<PerLookupScope>(),
        name: None,
    })
}

/// Builder for an [`Injector`].
///
/// ```rust
/// use ferrous_wire::{Injector, InjectorOptions, TracingObserver};
/// use std::sync::Arc;
///
/// let injector = Injector::builder()
///     .bindings("settings", |binder| {
///         binder.bind::<u16>().named("port").to_instance(Arc::new(8080))?;
///         Ok(())
///     })
///     .options(InjectorOptions::new().with_auto_bindings(true))
///     .observer(Arc::new(TracingObserver))
///     .build()
///     .unwrap();
/// assert_eq!(*injector.get_named::<u16>("port").unwrap(), 8080);
/// assert!(injector.options().auto_bindings);
/// ```
#[derive(Default)]
pub struct InjectorBuilder {
    modules: Vec<ModuleHandle>,
    options: InjectorOptions,
    observers: Observers,
}

impl InjectorBuilder {
    pub fn module<M: Module>(mut self, module: M) -> Self {
        self.modules.push(ModuleHandle::new(module));
        self
    }

    /// Adds a shared module handle; a handle also installed elsewhere is
    /// still configured once.
    pub fn module_handle(mut self, handle: ModuleHandle) -> Self {
        self.modules.push(handle);
        self
    }

    pub fn modules(mut self, modules: Vec<Box<dyn Module>>) -> Self {
        self.modules.extend(modules.into_iter().map(ModuleHandle::from_boxed));
        self
    }

    /// Adds a module declared by a closure.
    pub fn bindings<F>(self, name: &'static str, configure: F) -> Self
    where
        F: Fn(&mut Binder) -> DiResult<()> + Send + Sync + 'static,
    {
        self.module(module::from_fn(name, configure))
    }

    pub fn options(mut self, options: InjectorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn auto_bindings(mut self, enabled: bool) -> Self {
        self.options.auto_bindings = enabled;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn DiObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Configures the modules and realizes every provider.
    pub fn build(self) -> DiResult<Injector> {
        let started = Instant::now();
        let mut root = Binder::new("root".into(), false);
        root.bind::<PerLookupScope>().to_instance(Arc::new(PerLookupScope))?;
        root.bind::<SingletonScope>().to_instance(Arc::new(SingletonScope))?;
        root.bind::<ImmediateScope>().to_instance(Arc::new(ImmediateScope))?;
        root.bind::<ThreadScope>().to_instance(Arc::new(ThreadScope))?;
        root.bind::<ContextScope>().to_instance(Arc::new(ContextScope::new()))?;
        for handle in &self.modules {
            root.install_handle(handle)?;
        }
        let mut registry = root.into_registry();
        let options = self.options;
        let observers = self.observers;
        let inner = Arc::new_cyclic(|weak| {
            registry.register(RegisteredBinding::new(injector_binding(weak.clone())), true);
            InjectorInner {
                state: Arc::new(InjectionState::root(Arc::new(registry), options)),
                observers,
            }
        });
        let injector = Injector { inner };
        debug!(
            modules = self.modules.len(),
            bindings = injector.inner.state.registry().len(),
            "configured injector"
        );
        let providers = realize(&injector.inner.state)?;
        info!(providers, elapsed = ?started.elapsed(), "injector ready");
        Ok(injector)
    }
}

impl fmt::Debug for InjectorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectorBuilder")
            .field("modules", &self.modules)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{Arguments, Signature};

    #[derive(Debug)]
    struct Clock;
    impl Injectable for Clock {
        fn signature() -> Signature {
            Signature::of::<Self>()
        }
        fn construct(_: &Arguments) -> DiResult<Self> {
            Ok(Clock)
        }
    }

    #[test]
    fn injector_is_bound_to_itself() {
        let injector = Injector::new(Vec::new()).unwrap();
        let own = injector.get::<Injector>().unwrap();
        assert!(Arc::ptr_eq(&own.inner, &injector.inner));
    }

    #[test]
    fn builtin_scopes_are_bound() {
        let injector = Injector::new(Vec::new()).unwrap();
        assert!(injector.get::<SingletonScope>().is_ok());
        assert!(injector.get::<ContextScope>().is_ok());
        let targets = injector.registered_targets();
        assert!(targets.contains(&Target::of::<ThreadScope>()));
        assert!(targets.contains(&Target::of::<Injector>()));
    }

    #[test]
    fn dropped_injector_fails_outstanding_factories() {
        let injector = Injector::new(Vec::new()).unwrap();
        let provider = injector.provider(&Target::of::<Injector>()).unwrap();
        drop(injector);
        assert!(provider.get().is_err());
    }

    #[test]
    fn jit_needs_auto_bindings() {
        let injector = Injector::new(Vec::new()).unwrap();
        assert!(injector.get_constructible::<Clock>().unwrap_err().is_no_binding());

        let injector = Injector::builder().auto_bindings(true).build().unwrap();
        let a = injector.get_constructible::<Clock>().unwrap();
        let b = injector.get::<Clock>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
