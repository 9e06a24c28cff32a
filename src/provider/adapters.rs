//! Turns registered bindings into providers.
//!
//! Dispatch is keyed by the binding variant. Bindings declared in private
//! modules are first routed into the injection state of their module, one
//! module per step, and built there.

use std::borrow::Cow;

use tracing::trace;

use super::factories::{is_bound, provider_for};
use super::{collection_items, Collection, InjectionContext, Provider};
use crate::binding::{
    AliasBinding, Binding, FactorySource, InstanceBinding, MultiBinding, ProviderBinding, RegisteredBinding,
    SelfBinding,
};
use crate::error::{DiError, DiResult};
use crate::key::{Target, TargetType, TypeInfo};
use crate::scope::ScopeRef;
use crate::signature::{Arguments, Constructor, ParamKind, Parameter};

/// Provider for a registered binding, cached in the context's state when
/// `cache` is set.
pub(crate) fn adapt(registered: &RegisteredBinding, ctx: &InjectionContext<'_>, cache: bool) -> DiResult<Provider> {
    // Multi bindings stay here: each item carries its own source path.
    if !matches!(registered.binding, Binding::Multi(_)) {
        if let Some((module, rest)) = registered.source_path.split_first() {
            let inner_state = ctx.state().private_state(module);
            let inner = RegisteredBinding {
                binding: registered.binding.clone(),
                source_path: rest.iter().cloned().collect(),
            };
            let provider = adapt(&inner, &ctx.with_state(inner_state), cache)?;
            return Ok(store(ctx, provider, cache));
        }
    }

    let provider = match &registered.binding {
        Binding::Instance(binding) => instance(binding, ctx)?,
        Binding::Alias(binding) => alias(binding, ctx)?,
        Binding::SelfBinding(binding) => self_binding(binding, ctx)?,
        Binding::Provider(binding) => factory(binding, ctx)?,
        Binding::Multi(binding) => multi(binding, ctx)?,
    };
    trace!(
        target = %ctx.target(),
        kind = registered.binding.kind(),
        scope = ?registered.binding.scope(),
        class = ?ctx.current_class(),
        parameter = ?ctx.current_parameter(),
        "created provider"
    );
    Ok(store(ctx, provider, cache))
}

fn store(ctx: &InjectionContext<'_>, provider: Provider, cache: bool) -> Provider {
    if cache {
        ctx.state().provider_cache().insert(ctx.target().clone(), provider)
    } else {
        provider
    }
}

fn instance(binding: &InstanceBinding, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    if !binding.scope.is_singleton_like() {
        return Err(DiError::non_injectable(
            ctx.target(),
            format!(
                "instance bindings must be singleton-scoped, not {}",
                binding.scope.type_info().simple_name()
            ),
        ));
    }
    Ok(Provider::constant(binding.instance.clone()))
}

/// The bound type's provider, converted on every call. The bound type's own
/// binding carries the scope.
fn alias(binding: &AliasBinding, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let bound = Target::with_name(TargetType::Type(binding.bound), binding.name.clone());
    let provider = provider_for(&ctx.child(bound)?)?;
    let cast = binding.cast.clone();
    Ok(Provider::from_fn(move || cast(provider.get()?)))
}

fn self_binding(binding: &SelfBinding, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let unscoped = constructor_provider(binding.constructor, ctx)?;
    scoped(binding.scope, unscoped, ctx)
}

fn factory(binding: &ProviderBinding, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let factory = match &binding.source {
        FactorySource::Instance { instance, .. } => Provider::constant(instance.clone()),
        FactorySource::Class { factory, .. } => {
            let target = Target::with_name(TargetType::Type(*factory), binding.name.clone());
            provider_for(&ctx.child(target)?)?
        }
    };
    let invoke = binding.invoke.clone();
    let unscoped = Provider::from_fn(move || invoke(&factory.get()?));
    scoped(binding.scope, unscoped, ctx)
}

/// Item providers are built uncached; only the composed list is cached.
fn multi(binding: &MultiBinding, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let mut items = Vec::with_capacity(binding.registered_items.len());
    for (item, registered) in binding.item_bindings.iter().zip(&binding.registered_items) {
        let frame = ctx.child(Target::new(registered.target().target_type().clone()))?;
        let provider = adapt(registered, &frame, false)?;
        items.push((item.clone(), provider));
    }
    let unscoped = Provider::from_fn(move || {
        let values = items
            .iter()
            .map(|(item, provider)| item.apply_cast(provider.get()?))
            .collect::<DiResult<Vec<_>>>()?;
        Ok(Collection::list(values))
    });
    scoped(binding.scope, unscoped, ctx)
}

/// Wraps `unscoped` with the scope instance bound for `scope`.
fn scoped(scope: ScopeRef, unscoped: Provider, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let target = Target::new(TargetType::Type(scope.type_info()));
    let value = match provider_for(&ctx.child(target)?) {
        Ok(provider) => provider.get()?,
        Err(err) if err.is_no_binding() => {
            return Err(DiError::non_injectable(
                ctx.target(),
                format!("unknown scope {}", scope.type_info()),
            ))
        }
        Err(err) => return Err(err),
    };
    scope.cast(&value)?.wrap(unscoped)
}

enum Resolved {
    Positional(&'static str, Provider),
    Variadic(Provider),
    Keyword(&'static str, Provider),
}

/// Resolves every parameter of `constructor` now and returns a provider
/// calling the constructor with fresh arguments on each `get()`.
fn constructor_provider(constructor: Constructor, ctx: &InjectionContext<'_>) -> DiResult<Provider> {
    let class = constructor.type_info();
    let signature = constructor.signature();
    let owner = signature.owner().unwrap_or_else(|| class.name());
    let mut resolved = Vec::with_capacity(signature.parameters().len());
    for parameter in signature.parameters() {
        let entry = match parameter.param_kind() {
            ParamKind::VarKeyword => continue,
            ParamKind::VarPositional => Resolved::Variadic(parameter_provider(parameter, class, true, ctx)?),
            ParamKind::KeywordOnly => {
                Resolved::Keyword(parameter.name(), parameter_provider(parameter, class, false, ctx)?)
            }
            ParamKind::PositionalOnly | ParamKind::Ordinary => {
                Resolved::Positional(parameter.name(), parameter_provider(parameter, class, false, ctx)?)
            }
        };
        resolved.push(entry);
    }
    Ok(Provider::from_fn(move || {
        let mut args = Arguments::new(owner);
        for entry in &resolved {
            match entry {
                Resolved::Positional(name, provider) => args.push_positional(name, provider.get()?),
                Resolved::Variadic(provider) => {
                    args.extend_variadic(collection_items(&provider.get()?, owner)?);
                }
                Resolved::Keyword(name, provider) => args.push_keyword(name, provider.get()?),
            }
        }
        constructor.construct(&args)
    }))
}

/// Candidate targets of a parameter, most specific first.
fn candidates(parameter: &Parameter, variadic: bool) -> Vec<Target> {
    let Some(declared) = parameter.declared_type() else {
        return Vec::new();
    };
    let ty = if variadic { declared.clone().list() } else { declared.clone() };
    match parameter.name_tag_cow() {
        Some(tag) => vec![Target::with_name(ty, Some(tag))],
        None => vec![
            Target::with_name(ty.clone(), Some(Cow::Borrowed(parameter.name()))),
            Target::new(ty),
        ],
    }
}

fn parameter_provider(
    parameter: &Parameter,
    class: TypeInfo,
    variadic: bool,
    ctx: &InjectionContext<'_>,
) -> DiResult<Provider> {
    let by_parameter_name = parameter.name_tag().is_none();
    for (index, candidate) in candidates(parameter, variadic).into_iter().enumerate() {
        // An optional found under the parameter name alone would hide the
        // unnamed binding behind an absent value.
        if by_parameter_name && index == 0 && !is_bound(ctx.state(), &candidate)? {
            continue;
        }
        let frame = ctx.parameter(candidate, class, parameter.name())?;
        match provider_for(&frame) {
            Ok(provider) => return Ok(provider),
            Err(err) if err.is_no_binding() => continue,
            Err(err) => return Err(err),
        }
    }
    if let Some(default) = parameter.default() {
        return Ok(Provider::constant(default.clone()));
    }
    if variadic {
        return Ok(Provider::constant(Collection::list(Vec::new())));
    }
    let reason = match parameter.declared_type() {
        Some(ty) => format!("no binding for parameter `{}` of type {}", parameter.name(), ty),
        None => format!("parameter `{}` has no type and no default", parameter.name()),
    };
    Err(DiError::non_injectable(ctx.target(), reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    struct Service;

    #[test]
    fn untagged_parameter_tries_its_name_then_no_name() {
        let parameter = Parameter::of::<u16>("port");
        let found = candidates(&parameter, false);
        assert_eq!(found, vec![Target::named_of::<u16>("port"), Target::of::<u16>()]);
    }

    #[test]
    fn tagged_parameter_only_tries_the_tag() {
        let signature = Signature::of::<Service>()
            .param::<u16>("port")
            .annotate("port", "http")
            .unwrap();
        let found = candidates(&signature.parameters()[0], false);
        assert_eq!(found, vec![Target::named_of::<u16>("http")]);
    }

    #[test]
    fn variadic_parameter_resolves_lists() {
        let parameter = Parameter::of::<u8>("rest").variadic();
        let found = candidates(&parameter, true);
        assert_eq!(found[1], Target::new(TargetType::list_of::<u8>()));
    }

    #[test]
    fn untyped_parameter_has_no_candidates() {
        assert!(candidates(&Parameter::untyped("extra"), false).is_empty());
    }
}
