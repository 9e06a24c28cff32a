//! The ordered provider-factory chain.
//!
//! Each factory either produces a provider for the current target or refuses
//! with [`DiError::IncompatibleProviderFactory`], handing over to the next
//! one. Order: cached providers, registered bindings, synthesized lists,
//! sets and tuples, optionals, type handles, provider indirection, and
//! just-in-time construction.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::adapters;
use super::{collection_items, Absent, Collection, InjectionContext, InjectionState, Provider, Value};
use crate::binding::{Binding, RegisteredBinding, SelfBinding};
use crate::error::{DiError, DiResult};
use crate::key::{Target, TargetType, TypeInfo};
use crate::scope::ScopeRef;

/// Produces the provider for the target of a context.
pub(crate) trait ProviderFactory: Sync {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider>;
}

static CHAIN: [&dyn ProviderFactory; 7] = [
    &FromCache,
    &FromBinding,
    &Collections,
    &Optional,
    &TypeOf,
    &ProviderOf,
    &JustInTime,
];

fn refuse<T>() -> DiResult<T> {
    Err(DiError::IncompatibleProviderFactory)
}

/// Provider for the context's target, created at most once per state.
pub(crate) fn provider_for(ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let _creating = ctx.state().creation_lock().lock();
    for factory in CHAIN.iter() {
        match factory.create(ctx) {
            Err(err) if err.is_refusal() => continue,
            Err(err) => return Err(err),
            Ok(provider) => {
                return Ok(ctx
                    .state()
                    .provider_cache()
                    .insert(ctx.target().clone(), provider))
            }
        }
    }
    Err(DiError::NoBindingFound(ctx.target().to_string()))
}

struct FromCache;

impl ProviderFactory for FromCache {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        match ctx.state().provider_cache().get(ctx.target()) {
            Some(provider) => Ok(provider),
            None => refuse(),
        }
    }
}

struct FromBinding;

impl ProviderFactory for FromBinding {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        let Some((state, registered)) = ctx.state().find_binding(ctx.target())? else {
            return refuse();
        };
        let bound_target = registered.target();
        if &bound_target != ctx.target() {
            // Looked up by simple name: resolve the concrete target instead.
            return provider_for(&ctx.child(bound_target)?);
        }
        if !Arc::ptr_eq(&state, ctx.state()) {
            // Bound in an enclosing state: built there so its scope is shared.
            return provider_for(&ctx.with_state(state));
        }
        adapters::adapt(&registered, ctx, true)
    }
}

struct Collections;

impl ProviderFactory for Collections {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        let target = ctx.target();
        match target.target_type() {
            TargetType::List(element) => {
                let element = provider_for(&ctx.child(target.retyped((**element).clone()))?)?;
                Ok(Provider::from_fn(move || Ok(Collection::list(vec![element.get()?]))))
            }
            TargetType::Set(element) => {
                let list = list_provider(ctx, element)?;
                let name = target.to_string();
                Ok(Provider::from_fn(move || {
                    let mut items: Vec<Value> = Vec::new();
                    for item in collection_items(&list.get()?, &name)? {
                        if !items.iter().any(|seen| Arc::ptr_eq(seen, &item)) {
                            items.push(item);
                        }
                    }
                    Ok(Collection::set(items))
                }))
            }
            TargetType::Tuple(element) => {
                let list = list_provider(ctx, element)?;
                let name = target.to_string();
                Ok(Provider::from_fn(move || {
                    Ok(Collection::list(collection_items(&list.get()?, &name)?))
                }))
            }
            _ => refuse(),
        }
    }
}

fn list_provider(ctx: &InjectionContext<'_>, element: &TargetType) -> DiResult<Provider> {
    provider_for(&ctx.child(ctx.target().retyped(element.clone().list()))?)
}

struct Optional;

impl ProviderFactory for Optional {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        let TargetType::Optional(element) = ctx.target().target_type() else {
            return refuse();
        };
        match provider_for(&ctx.child(ctx.target().retyped((**element).clone()))?) {
            Ok(provider) => Ok(provider),
            Err(err) if err.is_no_binding() => {
                let absent: Value = Arc::new(Absent);
                Ok(Provider::constant(absent))
            }
            Err(err) => Err(err),
        }
    }
}

struct TypeOf;

impl ProviderFactory for TypeOf {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        let TargetType::TypeOf(element) = ctx.target().target_type() else {
            return refuse();
        };
        let element = ctx.target().retyped((**element).clone());
        let info = match ctx.state().find_binding(&element)? {
            Some((_, registered)) => match registered.binding() {
                Binding::SelfBinding(binding) => binding.target,
                Binding::Alias(binding) => binding.bound,
                other => {
                    return Err(DiError::non_injectable(
                        ctx.target(),
                        format!("{} binding has no constructed type", other.kind()),
                    ))
                }
            },
            None => match jit_constructible(ctx.state(), &element) {
                Some(info) => info,
                None => return Err(DiError::NoBindingFound(element.to_string())),
            },
        };
        let value: Value = Arc::new(info);
        Ok(Provider::constant(value))
    }
}

struct ProviderOf;

impl ProviderFactory for ProviderOf {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        let TargetType::ProviderOf(element) = ctx.target().target_type() else {
            return refuse();
        };
        let element = ctx.target().retyped((**element).clone());
        if !is_resolvable(ctx.state(), &element)? {
            return Err(DiError::NoBindingFound(element.to_string()));
        }
        let state = Arc::downgrade(ctx.state());
        let resolved: OnceCell<Provider> = OnceCell::new();
        // Resolved on first use so that a provider can point back into the
        // graph that is still being built.
        let lazy = Provider::from_fn(move || {
            let provider = resolved.get_or_try_init(|| {
                let state = state
                    .upgrade()
                    .ok_or_else(|| DiError::non_injectable(&element, "the injector has been dropped"))?;
                provider_for(&InjectionContext::new(element.clone(), state))
            })?;
            provider.get()
        });
        let value: Value = Arc::new(lazy);
        Ok(Provider::constant(value))
    }
}

struct JustInTime;

impl ProviderFactory for JustInTime {
    fn create(&self, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
        let Some(info) = jit_constructible(ctx.state(), ctx.target()) else {
            return refuse();
        };
        let Some(constructor) = info.constructor() else {
            return refuse();
        };
        let root = root_state(ctx.state());
        if !Arc::ptr_eq(&root, ctx.state()) {
            return provider_for(&ctx.with_state(root));
        }
        let binding = RegisteredBinding::new(Binding::SelfBinding(SelfBinding::from_constructor(
            constructor,
            ScopeRef::singleton(),
            None,
        )));
        adapters::adapt(&binding, ctx, true)
    }
}

/// The type of an unnamed plain target that may be built just in time.
fn jit_constructible(state: &InjectionState, target: &Target) -> Option<TypeInfo> {
    if !state.options().auto_bindings || target.name().is_some() {
        return None;
    }
    target
        .target_type()
        .type_info()
        .filter(|info| info.constructor().is_some())
        .copied()
}

/// Whether `target` resolves to something other than an absent optional,
/// judged from the registries alone. Nothing is constructed.
pub(crate) fn is_bound(state: &Arc<InjectionState>, target: &Target) -> DiResult<bool> {
    if state.find_binding(target)?.is_some() {
        return Ok(true);
    }
    match target.target_type() {
        TargetType::Type(_) => Ok(jit_constructible(state, target).is_some()),
        TargetType::List(element)
        | TargetType::Optional(element)
        | TargetType::TypeOf(element)
        | TargetType::ProviderOf(element) => is_bound(state, &target.retyped((**element).clone())),
        TargetType::Set(element) | TargetType::Tuple(element) => {
            is_bound(state, &target.retyped((**element).clone().list()))
        }
        TargetType::Unresolved(_) => Ok(false),
    }
}

/// Whether a provider of `target` can be handed out. Optionals always
/// resolve, to an absent value when nothing is bound.
fn is_resolvable(state: &Arc<InjectionState>, target: &Target) -> DiResult<bool> {
    match target.target_type() {
        TargetType::Optional(_) => Ok(true),
        TargetType::ProviderOf(element) => is_resolvable(state, &target.retyped((**element).clone())),
        _ => is_bound(state, target),
    }
}

fn root_state(state: &Arc<InjectionState>) -> Arc<InjectionState> {
    let mut current = state.clone();
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}
