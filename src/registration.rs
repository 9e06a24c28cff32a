//! Binding registry: the mapping from targets to registered bindings.

use indexmap::IndexMap;
use tracing::debug;

use crate::binding::{Binding, FactorySource, InstanceBinding, RegisteredBinding, SelfBinding};
use crate::error::{DiError, DiResult};
use crate::key::{Target, TargetType, TypeInfo};
use crate::scope::ScopeRef;

/// Registry holding every binding visible in one module or injection state.
///
/// Storage keeps insertion order, so iteration (and therefore eager
/// realization and error reporting) is deterministic.
#[derive(Clone, Default)]
pub struct BindingRegistry {
    bindings: IndexMap<Target, RegisteredBinding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or merges a registered binding.
    ///
    /// A multi binding registered over another multi binding without the
    /// override flag appends its items; anything else replaces the previous
    /// entry. With `add_self_binding`, types the binding needs to build
    /// (alias targets, factory classes, instance types) get a binding of
    /// their own unless one is already present.
    pub fn register(&mut self, registered: RegisteredBinding, add_self_binding: bool) {
        let target = registered.target();
        let mut extended = false;
        if let Some(previous) = self.bindings.get_mut(&target) {
            match (&mut previous.binding, &registered.binding) {
                (Binding::Multi(prev), Binding::Multi(new)) if !new.override_bindings => {
                    prev.extend_from(new);
                    debug!(target = %target, items = prev.item_bindings.len(), "extended multi binding");
                    extended = true;
                }
                (prev, new) => {
                    if !prev.same_declaration(new) {
                        debug!(target = %target, previous = prev.kind(), new = new.kind(), "overriding binding");
                    }
                }
            }
        }
        if !extended {
            self.bindings.insert(target, registered.clone());
        }
        if add_self_binding {
            self.add_self_binding(&registered.binding);
        }
    }

    fn register_if_absent(&mut self, binding: Binding) {
        let target = binding.target();
        if !self.bindings.contains_key(&target) {
            debug!(target = %target, kind = binding.kind(), "registered implied binding");
            self.bindings.insert(target, RegisteredBinding::new(binding));
        }
    }

    fn add_self_binding(&mut self, binding: &Binding) {
        match binding {
            Binding::Provider(provider) => match &provider.source {
                FactorySource::Class { constructor, .. } => {
                    self.register_if_absent(Binding::SelfBinding(SelfBinding::from_constructor(
                        *constructor,
                        provider.scope,
                        provider.name.clone(),
                    )));
                }
                FactorySource::Instance { factory, instance } => {
                    self.register_if_absent(Binding::Instance(InstanceBinding {
                        target: *factory,
                        instance: instance.clone(),
                        scope: ScopeRef::singleton(),
                        name: provider.name.clone(),
                    }));
                }
            },
            Binding::Alias(alias) => {
                self.register_if_absent(Binding::SelfBinding(SelfBinding::from_constructor(
                    alias.bound_constructor,
                    alias.scope,
                    alias.name.clone(),
                )));
            }
            Binding::Instance(instance) => {
                self.register_if_absent(Binding::Instance(instance.clone()));
            }
            Binding::Multi(multi) => {
                for item in &multi.registered_items {
                    match &item.binding {
                        // A trait-object instance has no nameable type of its
                        // own and would shadow the element type.
                        Binding::Instance(instance) if instance.target.is_sized() => {
                            self.register_if_absent(item.binding.clone());
                        }
                        Binding::Provider(_) => self.add_self_binding(&item.binding),
                        _ => {}
                    }
                }
            }
            Binding::SelfBinding(_) => {}
        }
    }

    /// Looks a target up.
    ///
    /// Targets naming a type by its unqualified name match the single
    /// registered target with that simple name; several matches are an error.
    pub fn get(&self, target: &Target) -> DiResult<Option<&RegisteredBinding>> {
        if !contains_unresolved(target.target_type()) {
            return Ok(self.bindings.get(target));
        }
        let mut matches = self
            .bindings
            .iter()
            .filter(|(candidate, _)| {
                candidate.name() == target.name()
                    && matches_unresolved(target.target_type(), candidate.target_type())
            })
            .map(|(_, registered)| registered);
        let first = matches.next();
        if let Some(second) = matches.next() {
            return Err(DiError::non_injectable(
                target,
                format!(
                    "multiple types with this name: {} and {}",
                    first.map(|r| r.target().to_string()).unwrap_or_default(),
                    second.target()
                ),
            ));
        }
        Ok(first)
    }

    pub fn contains(&self, target: &Target) -> bool {
        matches!(self.get(target), Ok(Some(_)))
    }

    /// Every registered binding, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &RegisteredBinding> {
        self.bindings.values()
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

fn contains_unresolved(ty: &TargetType) -> bool {
    match ty {
        TargetType::Unresolved(_) => true,
        TargetType::Type(_) => false,
        TargetType::List(inner)
        | TargetType::Set(inner)
        | TargetType::Tuple(inner)
        | TargetType::Optional(inner)
        | TargetType::TypeOf(inner)
        | TargetType::ProviderOf(inner) => contains_unresolved(inner),
    }
}

fn matches_unresolved(pattern: &TargetType, candidate: &TargetType) -> bool {
    match (pattern, candidate) {
        (TargetType::Unresolved(name), TargetType::Type(info)) => simple_name_matches(name, info),
        (TargetType::Type(a), TargetType::Type(b)) => a == b,
        (TargetType::List(a), TargetType::List(b))
        | (TargetType::Set(a), TargetType::Set(b))
        | (TargetType::Tuple(a), TargetType::Tuple(b))
        | (TargetType::Optional(a), TargetType::Optional(b))
        | (TargetType::TypeOf(a), TargetType::TypeOf(b))
        | (TargetType::ProviderOf(a), TargetType::ProviderOf(b)) => matches_unresolved(a, b),
        _ => false,
    }
}

fn simple_name_matches(name: &str, info: &TypeInfo) -> bool {
    crate::key::simple_name(name) == info.simple_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ItemBinding, MultiBinding};
    use crate::provider::erase;
    use std::sync::Arc;

    fn instance<T: Send + Sync + 'static>(value: T, name: Option<&'static str>) -> RegisteredBinding {
        RegisteredBinding::new(Binding::Instance(InstanceBinding {
            target: TypeInfo::of::<T>(),
            instance: erase(Arc::new(value)),
            scope: ScopeRef::singleton(),
            name: name.map(Into::into),
        }))
    }

    fn multi(values: &[u8], override_bindings: bool) -> RegisteredBinding {
        let items: Vec<ItemBinding> = values.iter().map(|v| ItemBinding::instance(Arc::new(*v))).collect();
        let registered_items = items
            .iter()
            .map(|i| RegisteredBinding::new(i.to_binding().unwrap()))
            .collect();
        RegisteredBinding::new(Binding::Multi(MultiBinding {
            item_target: TargetType::of::<u8>(),
            item_bindings: items,
            registered_items,
            scope: ScopeRef::singleton(),
            name: None,
            override_bindings,
        }))
    }

    #[test]
    fn later_binding_replaces_earlier() {
        let mut registry = BindingRegistry::new();
        registry.register(instance(1u32, None), true);
        let second = instance(2u32, None);
        registry.register(second.clone(), true);
        let found = registry.get(&Target::of::<u32>()).unwrap().unwrap();
        assert!(found.binding().same_declaration(second.binding()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn multi_without_override_extends() {
        let mut registry = BindingRegistry::new();
        registry.register(multi(&[1, 2], false), false);
        registry.register(multi(&[3], false), false);
        let found = registry.get(&Target::new(TargetType::list_of::<u8>())).unwrap().unwrap();
        let multi = found.binding().as_multi().unwrap();
        assert_eq!(multi.item_bindings().len(), 3);
        assert_eq!(multi.registered_items().len(), 3);
    }

    #[test]
    fn multi_with_override_replaces() {
        let mut registry = BindingRegistry::new();
        registry.register(multi(&[1, 2], false), false);
        registry.register(multi(&[3], true), false);
        let found = registry.get(&Target::new(TargetType::list_of::<u8>())).unwrap().unwrap();
        assert_eq!(found.binding().as_multi().unwrap().item_bindings().len(), 1);
    }

    #[test]
    fn names_disambiguate_targets() {
        let mut registry = BindingRegistry::new();
        registry.register(instance(1u32, None), true);
        registry.register(instance(2u32, Some("port")), true);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&Target::named_of::<u32>("port")));
        assert!(!registry.contains(&Target::named_of::<u32>("host")));
    }

    #[test]
    fn sized_multi_instance_implies_its_type() {
        let mut registry = BindingRegistry::new();
        registry.register(multi(&[7, 8], false), true);
        let found = registry.get(&Target::of::<u8>()).unwrap().unwrap();
        let Binding::Instance(instance) = found.binding() else {
            panic!("expected an instance binding");
        };
        assert_eq!(*crate::provider::downcast::<u8>(&instance.instance).unwrap(), 7);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn multi_instance_keeps_an_existing_binding() {
        let mut registry = BindingRegistry::new();
        registry.register(instance(1u8, None), true);
        registry.register(multi(&[7], false), true);
        let found = registry.get(&Target::of::<u8>()).unwrap().unwrap();
        let Binding::Instance(instance) = found.binding() else {
            panic!("expected an instance binding");
        };
        assert_eq!(*crate::provider::downcast::<u8>(&instance.instance).unwrap(), 1);
    }

    trait Plugin: Send + Sync {}
    struct Widget;
    impl Plugin for Widget {}
    impl crate::signature::Injectable for Widget {
        fn signature() -> crate::signature::Signature {
            crate::signature::Signature::of::<Self>()
        }
        fn construct(_: &crate::signature::Arguments) -> DiResult<Self> {
            Ok(Widget)
        }
    }

    fn plugin_multi(items: Vec<ItemBinding>) -> RegisteredBinding {
        let registered_items = items
            .iter()
            .map(|i| RegisteredBinding::new(i.to_binding().unwrap()))
            .collect();
        RegisteredBinding::new(Binding::Multi(MultiBinding {
            item_target: TargetType::of::<dyn Plugin>(),
            item_bindings: items,
            registered_items,
            scope: ScopeRef::singleton(),
            name: None,
            override_bindings: false,
        }))
    }

    #[test]
    fn trait_object_items_imply_nothing() {
        let mut registry = BindingRegistry::new();
        let widget: Arc<dyn Plugin> = Arc::new(Widget);
        registry.register(
            plugin_multi(vec![
                ItemBinding::instance(widget),
                ItemBinding::class_as::<Widget, dyn Plugin, _>(|w| w as Arc<dyn Plugin>),
            ]),
            true,
        );
        assert!(!registry.contains(&Target::of::<dyn Plugin>()));
        assert!(!registry.contains(&Target::of::<Widget>()));
        assert_eq!(registry.len(), 1);
    }

    mod first {
        pub struct Config;
    }
    mod second {
        pub struct Config;
    }

    #[test]
    fn string_lookup_finds_unique_simple_name() {
        let mut registry = BindingRegistry::new();
        registry.register(instance(first::Config, None), true);
        let found = registry.get(&Target::new(TargetType::by_name("Config"))).unwrap();
        assert_eq!(found.unwrap().target(), Target::of::<first::Config>());
        assert!(registry.get(&Target::new(TargetType::by_name("Missing"))).unwrap().is_none());
    }

    #[test]
    fn string_lookup_with_ambiguous_name_fails() {
        let mut registry = BindingRegistry::new();
        registry.register(instance(first::Config, None), true);
        registry.register(instance(second::Config, None), true);
        let err = registry.get(&Target::new(TargetType::by_name("Config"))).unwrap_err();
        assert!(matches!(err, DiError::NonInjectableType { .. }));
    }
}
