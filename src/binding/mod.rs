//! Binding variants: declarative recipes attached to targets.
//!
//! A [`Binding`] is a tagged union with exactly one recipe per registered
//! target. Bindings are created by [`Binder`](crate::Binder) and never
//! mutated after registration, except that a multi binding may be extended
//! with more items.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{Target, TargetType, TypeInfo};
use crate::provider::{downcast, erase, Value};
use crate::scope::{PerLookupScope, ScopeRef};
use crate::signature::{Constructor, Injectable};

mod registered;

pub use registered::{PrivateModuleRef, RegisteredBinding, SourcePath};

/// User-defined factory whose single operation yields a value.
///
/// Bound with [`BindingBuilder::to_provider`](crate::BindingBuilder::to_provider)
/// (the container builds the factory) or
/// [`BindingBuilder::to_provider_instance`](crate::BindingBuilder::to_provider_instance).
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{DiResult, Factory};
/// use std::sync::Arc;
///
/// struct ConnectionString;
///
/// impl Factory for ConnectionString {
///     type Output = String;
///     fn get(&self) -> DiResult<Arc<String>> {
///         Ok(Arc::new("postgres://localhost".to_string()))
///     }
/// }
/// ```
pub trait Factory: Send + Sync + 'static {
    /// Type produced by the factory.
    type Output: ?Sized + Send + Sync + 'static;

    /// Produces one value.
    fn get(&self) -> DiResult<Arc<Self::Output>>;
}

/// Converts a value of one target into a value of another (e.g. `Arc<Impl>`
/// into `Arc<dyn Trait>`).
pub(crate) type Caster = Arc<dyn Fn(Value) -> DiResult<Value> + Send + Sync>;

/// Calls a type-erased factory instance.
pub(crate) type Invoker = Arc<dyn Fn(&Value) -> DiResult<Value> + Send + Sync>;

pub(crate) fn caster<C, T, F>(cast: F) -> Caster
where
    C: ?Sized + Send + Sync + 'static,
    T: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static,
{
    Arc::new(move |value: Value| Ok(erase(cast(downcast::<C>(&value)?))))
}

pub(crate) fn invoker<P: Factory>() -> Invoker {
    Arc::new(|factory: &Value| {
        let factory = downcast::<P>(factory)?;
        factory.get().map(erase)
    })
}

/// Build the target type itself through its constructor.
#[derive(Clone)]
pub struct SelfBinding {
    pub(crate) target: TypeInfo,
    pub(crate) constructor: Constructor,
    pub(crate) scope: ScopeRef,
    pub(crate) name: Option<Cow<'static, str>>,
}

impl SelfBinding {
    pub(crate) fn of<T: Injectable>(scope: ScopeRef, name: Option<Cow<'static, str>>) -> Self {
        Self::from_constructor(Constructor::of::<T>(), scope, name)
    }

    pub(crate) fn from_constructor(
        constructor: Constructor,
        scope: ScopeRef,
        name: Option<Cow<'static, str>>,
    ) -> Self {
        Self {
            target: constructor.type_info(),
            constructor,
            scope,
            name,
        }
    }
}

/// Construct `bound` and hand it out as the target type.
#[derive(Clone)]
pub struct AliasBinding {
    pub(crate) target: TypeInfo,
    pub(crate) bound: TypeInfo,
    pub(crate) bound_constructor: Constructor,
    pub(crate) cast: Caster,
    pub(crate) scope: ScopeRef,
    pub(crate) name: Option<Cow<'static, str>>,
}

/// Hand out a caller-supplied value.
#[derive(Clone)]
pub struct InstanceBinding {
    pub(crate) target: TypeInfo,
    pub(crate) instance: Value,
    pub(crate) scope: ScopeRef,
    pub(crate) name: Option<Cow<'static, str>>,
}

/// Where a provider binding gets its factory from.
#[derive(Clone)]
pub enum FactorySource {
    /// The container builds the factory type.
    Class { factory: TypeInfo, constructor: Constructor },
    /// A caller-supplied factory object.
    Instance { factory: TypeInfo, instance: Value },
}

impl FactorySource {
    pub fn factory_type(&self) -> TypeInfo {
        match self {
            FactorySource::Class { factory, .. } | FactorySource::Instance { factory, .. } => *factory,
        }
    }
}

/// Delegate construction to a [`Factory`].
#[derive(Clone)]
pub struct ProviderBinding {
    pub(crate) target: TypeInfo,
    pub(crate) source: FactorySource,
    pub(crate) invoke: Invoker,
    pub(crate) scope: ScopeRef,
    pub(crate) name: Option<Cow<'static, str>>,
}

/// Ordered list of item recipes bound at `List<item>`.
#[derive(Clone)]
pub struct MultiBinding {
    pub(crate) item_target: TargetType,
    pub(crate) item_bindings: Vec<ItemBinding>,
    pub(crate) registered_items: Vec<RegisteredBinding>,
    pub(crate) scope: ScopeRef,
    pub(crate) name: Option<Cow<'static, str>>,
    pub(crate) override_bindings: bool,
}

impl MultiBinding {
    pub fn item_bindings(&self) -> &[ItemBinding] {
        &self.item_bindings
    }

    pub fn registered_items(&self) -> &[RegisteredBinding] {
        &self.registered_items
    }

    pub fn overrides(&self) -> bool {
        self.override_bindings
    }

    /// Appends the items of another multi binding for the same target.
    pub(crate) fn extend_from(&mut self, other: &MultiBinding) {
        self.item_bindings.extend(other.item_bindings.iter().cloned());
        self.registered_items.extend(other.registered_items.iter().cloned());
    }
}

/// A declarative recipe attached to a target.
#[derive(Clone)]
pub enum Binding {
    SelfBinding(SelfBinding),
    Alias(AliasBinding),
    Instance(InstanceBinding),
    Provider(ProviderBinding),
    Multi(MultiBinding),
}

impl Binding {
    /// The target this binding is registered at.
    pub fn target(&self) -> Target {
        match self {
            Binding::SelfBinding(b) => Target::with_name(TargetType::Type(b.target), b.name.clone()),
            Binding::Alias(b) => Target::with_name(TargetType::Type(b.target), b.name.clone()),
            Binding::Instance(b) => Target::with_name(TargetType::Type(b.target), b.name.clone()),
            Binding::Provider(b) => Target::with_name(TargetType::Type(b.target), b.name.clone()),
            Binding::Multi(b) => Target::with_name(b.item_target.clone().list(), b.name.clone()),
        }
    }

    pub fn scope(&self) -> ScopeRef {
        match self {
            Binding::SelfBinding(b) => b.scope,
            Binding::Alias(b) => b.scope,
            Binding::Instance(b) => b.scope,
            Binding::Provider(b) => b.scope,
            Binding::Multi(b) => b.scope,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Binding::SelfBinding(b) => b.name.as_deref(),
            Binding::Alias(b) => b.name.as_deref(),
            Binding::Instance(b) => b.name.as_deref(),
            Binding::Provider(b) => b.name.as_deref(),
            Binding::Multi(b) => b.name.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Binding::SelfBinding(_) => "self",
            Binding::Alias(_) => "alias",
            Binding::Instance(_) => "instance",
            Binding::Provider(_) => "provider",
            Binding::Multi(_) => "multi",
        }
    }

    pub fn as_multi(&self) -> Option<&MultiBinding> {
        match self {
            Binding::Multi(b) => Some(b),
            _ => None,
        }
    }

    /// Whether two bindings are the same declaration.
    ///
    /// Instances and factories compare by identity, since values carry no
    /// equality in general.
    pub(crate) fn same_declaration(&self, other: &Binding) -> bool {
        match (self, other) {
            (Binding::SelfBinding(a), Binding::SelfBinding(b)) => {
                a.target == b.target && a.scope == b.scope && a.name == b.name
            }
            (Binding::Alias(a), Binding::Alias(b)) => {
                a.target == b.target && a.bound == b.bound && a.scope == b.scope && a.name == b.name
            }
            (Binding::Instance(a), Binding::Instance(b)) => {
                a.target == b.target && Arc::ptr_eq(&a.instance, &b.instance) && a.name == b.name
            }
            (Binding::Provider(a), Binding::Provider(b)) => {
                let same_source = match (&a.source, &b.source) {
                    (FactorySource::Class { factory: fa, .. }, FactorySource::Class { factory: fb, .. }) => fa == fb,
                    (
                        FactorySource::Instance { instance: ia, .. },
                        FactorySource::Instance { instance: ib, .. },
                    ) => Arc::ptr_eq(ia, ib),
                    _ => false,
                };
                a.target == b.target && same_source && a.scope == b.scope && a.name == b.name
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Binding");
        s.field("kind", &self.kind())
            .field("target", &self.target().to_string())
            .field("scope", &self.scope());
        match self {
            Binding::Alias(b) => {
                s.field("bound", &b.bound);
            }
            Binding::Provider(b) => {
                s.field("factory", &b.source.factory_type());
            }
            Binding::Multi(b) => {
                s.field("items", &b.item_bindings.len()).field("override", &b.override_bindings);
            }
            _ => {}
        }
        s.finish()
    }
}

#[derive(Clone)]
pub(crate) enum ItemRecipe {
    Class { constructor: Constructor },
    Instance { target: TypeInfo, instance: Value },
    Provider { target: TypeInfo, source: FactorySource, invoke: Invoker },
}

/// Unregistered item of a multi binding.
///
/// Exactly one of a class, an instance, or a factory; the default value has
/// none and is rejected by [`Binder::multi_bind`](crate::Binder::multi_bind).
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::ItemBinding;
/// use std::sync::Arc;
///
/// let item = ItemBinding::instance(Arc::new(3u32));
/// assert_eq!(item.kind(), Some("instance"));
/// assert_eq!(ItemBinding::default().kind(), None);
/// ```
#[derive(Clone, Default)]
pub struct ItemBinding {
    pub(crate) recipe: Option<ItemRecipe>,
    pub(crate) cast: Option<Caster>,
    pub(crate) output: Option<TypeInfo>,
}

impl ItemBinding {
    /// Item built by the container from `T`'s constructor.
    pub fn class<T: Injectable>() -> Self {
        Self {
            recipe: Some(ItemRecipe::Class {
                constructor: Constructor::of::<T>(),
            }),
            cast: None,
            output: Some(TypeInfo::of::<T>()),
        }
    }

    /// Item built from `C`'s constructor and converted to the item type.
    pub fn class_as<C, T, F>(cast: F) -> Self
    where
        C: Injectable,
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            recipe: Some(ItemRecipe::Class {
                constructor: Constructor::of::<C>(),
            }),
            cast: Some(caster(cast)),
            output: Some(TypeInfo::of::<T>()),
        }
    }

    /// Item holding a caller-supplied value.
    pub fn instance<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            recipe: Some(ItemRecipe::Instance {
                target: TypeInfo::of::<T>(),
                instance: erase(instance),
            }),
            cast: None,
            output: Some(TypeInfo::of::<T>()),
        }
    }

    /// Item produced by a factory the container builds.
    pub fn provider<P: Factory + Injectable>() -> Self {
        Self {
            recipe: Some(ItemRecipe::Provider {
                target: TypeInfo::of::<P::Output>(),
                source: FactorySource::Class {
                    factory: TypeInfo::constructible::<P>(),
                    constructor: Constructor::of::<P>(),
                },
                invoke: invoker::<P>(),
            }),
            cast: None,
            output: Some(TypeInfo::of::<P::Output>()),
        }
    }

    /// Item produced by a caller-supplied factory.
    pub fn provider_instance<P: Factory>(factory: P) -> Self {
        Self {
            recipe: Some(ItemRecipe::Provider {
                target: TypeInfo::of::<P::Output>(),
                source: FactorySource::Instance {
                    factory: TypeInfo::of::<P>(),
                    instance: erase(Arc::new(factory)),
                },
                invoke: invoker::<P>(),
            }),
            cast: None,
            output: Some(TypeInfo::of::<P::Output>()),
        }
    }

    pub fn kind(&self) -> Option<&'static str> {
        self.recipe.as_ref().map(|recipe| match recipe {
            ItemRecipe::Class { .. } => "class",
            ItemRecipe::Instance { .. } => "instance",
            ItemRecipe::Provider { .. } => "provider",
        })
    }

    /// Normalizes the item into a full binding.
    ///
    /// Class and factory items are per-lookup: the scope of the enclosing
    /// multi binding applies to the composed list.
    pub(crate) fn to_binding(&self) -> DiResult<Binding> {
        let recipe = self
            .recipe
            .as_ref()
            .ok_or_else(|| DiError::binding("empty item binding: no class, instance or provider"))?;
        Ok(match recipe {
            ItemRecipe::Class { constructor } => Binding::SelfBinding(SelfBinding::from_constructor(
                *constructor,
                ScopeRef::of::<PerLookupScope>(),
                None,
            )),
            ItemRecipe::Instance { target, instance } => Binding::Instance(InstanceBinding {
                target: *target,
                instance: instance.clone(),
                scope: ScopeRef::singleton(),
                name: None,
            }),
            ItemRecipe::Provider { target, source, invoke } => Binding::Provider(ProviderBinding {
                target: *target,
                source: source.clone(),
                invoke: invoke.clone(),
                scope: ScopeRef::of::<PerLookupScope>(),
                name: None,
            }),
        })
    }

    /// Type of the values this item contributes to the list.
    pub fn output_type(&self) -> Option<TypeInfo> {
        self.output
    }

    pub(crate) fn apply_cast(&self, value: Value) -> DiResult<Value> {
        match &self.cast {
            Some(cast) => cast(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for ItemBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemBinding")
            .field("kind", &self.kind())
            .field("cast", &self.cast.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{Arguments, Signature};

    struct Widget;
    impl Injectable for Widget {
        fn signature() -> Signature {
            Signature::of::<Self>()
        }
        fn construct(_: &Arguments) -> DiResult<Self> {
            Ok(Widget)
        }
    }

    #[test]
    fn empty_item_is_rejected() {
        let err = ItemBinding::default().to_binding().unwrap_err();
        assert!(matches!(err, DiError::Binding { .. }));
    }

    #[test]
    fn class_item_normalizes_to_per_lookup_self_binding() {
        let binding = ItemBinding::class::<Widget>().to_binding().unwrap();
        assert_eq!(binding.kind(), "self");
        assert_eq!(binding.target(), Target::of::<Widget>());
        assert_eq!(binding.scope(), ScopeRef::of::<PerLookupScope>());
    }

    #[test]
    fn instance_item_normalizes_to_instance_binding() {
        let binding = ItemBinding::instance(Arc::new(4u8)).to_binding().unwrap();
        assert_eq!(binding.kind(), "instance");
        assert_eq!(binding.target(), Target::of::<u8>());
    }

    #[test]
    fn same_declaration_compares_instances_by_identity() {
        let value = erase(Arc::new(1u8));
        let a = Binding::Instance(InstanceBinding {
            target: TypeInfo::of::<u8>(),
            instance: value.clone(),
            scope: ScopeRef::singleton(),
            name: None,
        });
        let b = Binding::Instance(InstanceBinding {
            target: TypeInfo::of::<u8>(),
            instance: value,
            scope: ScopeRef::singleton(),
            name: None,
        });
        let c = Binding::Instance(InstanceBinding {
            target: TypeInfo::of::<u8>(),
            instance: erase(Arc::new(1u8)),
            scope: ScopeRef::singleton(),
            name: None,
        });
        assert!(a.same_declaration(&b));
        assert!(!a.same_declaration(&c));
    }
}
