//! Constructor signatures for self-constructing types.
//!
//! Rust has no runtime reflection over constructors, so a type that the
//! container builds itself describes its constructor by implementing
//! [`Injectable`]: an ordered [`Signature`] of formal parameters and a
//! `construct` function that receives the resolved [`Arguments`].

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{TargetType, TypeInfo};
use crate::provider::{
    downcast, downcast_all, downcast_collection, downcast_optional, downcast_provider, downcast_type, erase,
    ProviderOf, Value,
};

/// A type the container can construct by resolving its parameters.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Arguments, DiResult, Injectable, Signature};
/// use std::sync::Arc;
///
/// struct Database {
///     url: Arc<String>,
/// }
///
/// impl Injectable for Database {
///     fn signature() -> Signature {
///         Signature::of::<Self>().param::<String>("url")
///     }
///
///     fn construct(args: &Arguments) -> DiResult<Self> {
///         Ok(Database { url: args.get::<String>("url")? })
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Formal parameters of the constructor, in declaration order.
    fn signature() -> Signature;

    /// Builds the instance from resolved arguments.
    fn construct(args: &Arguments) -> DiResult<Self>;
}

/// Type-erased constructor of an [`Injectable`] type.
#[derive(Clone, Copy)]
pub struct Constructor {
    type_info: fn() -> TypeInfo,
    signature: fn() -> Signature,
    construct: fn(&Arguments) -> DiResult<Value>,
}

fn construct_erased<T: Injectable>(args: &Arguments) -> DiResult<Value> {
    T::construct(args).map(|instance| erase(Arc::new(instance)))
}

impl Constructor {
    pub fn of<T: Injectable>() -> Self {
        Self {
            type_info: TypeInfo::constructible::<T>,
            signature: T::signature,
            construct: construct_erased::<T>,
        }
    }

    pub fn type_info(&self) -> TypeInfo {
        (self.type_info)()
    }

    pub fn signature(&self) -> Signature {
        (self.signature)()
    }

    pub(crate) fn construct(&self, args: &Arguments) -> DiResult<Value> {
        (self.construct)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.type_info().name())
    }
}

/// How a parameter is passed to the constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Passed by position only
    PositionalOnly,
    /// Passed by position, reachable by name
    Ordinary,
    /// Passed by name only
    KeywordOnly,
    /// Collects every value bound for `List<T>`
    VarPositional,
    /// Never injected
    VarKeyword,
}

/// One formal parameter of a constructor.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    ty: Option<TargetType>,
    name_tag: Option<Cow<'static, str>>,
    default: Option<Value>,
    kind: ParamKind,
}

impl Parameter {
    pub fn new(name: &'static str, ty: TargetType) -> Self {
        Self {
            name,
            ty: Some(ty),
            name_tag: None,
            default: None,
            kind: ParamKind::Ordinary,
        }
    }

    /// Ordinary parameter of plain type `T`.
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new(name, TargetType::of::<T>())
    }

    /// Ordinary parameter of an injectable type, built just in time when
    /// auto-bindings are enabled and nothing is bound for it.
    pub fn constructible<T: Injectable>(name: &'static str) -> Self {
        Self::new(name, TargetType::constructible::<T>())
    }

    /// Parameter without a declared type; it can only be satisfied by its default.
    pub fn untyped(name: &'static str) -> Self {
        Self {
            name,
            ty: None,
            name_tag: None,
            default: None,
            kind: ParamKind::Ordinary,
        }
    }

    /// Tags the declared type with a binding name.
    ///
    /// A tagged parameter is resolved only against `(type, tag)`.
    pub fn named(mut self, tag: impl Into<Cow<'static, str>>) -> Self {
        self.name_tag = Some(tag.into());
        self
    }

    /// Value used when no candidate target is bound.
    pub fn default_value<T: ?Sized + Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.default = Some(erase(value));
        self
    }

    /// Type-erased default, for composite parameter types.
    pub fn default_erased(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn keyword_only(self) -> Self {
        self.kind(ParamKind::KeywordOnly)
    }

    pub fn positional_only(self) -> Self {
        self.kind(ParamKind::PositionalOnly)
    }

    pub fn variadic(self) -> Self {
        self.kind(ParamKind::VarPositional)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declared_type(&self) -> Option<&TargetType> {
        self.ty.as_ref()
    }

    pub fn name_tag(&self) -> Option<&str> {
        self.name_tag.as_deref()
    }

    pub(crate) fn name_tag_cow(&self) -> Option<Cow<'static, str>> {
        self.name_tag.clone()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn param_kind(&self) -> ParamKind {
        self.kind
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("name_tag", &self.name_tag)
            .field("has_default", &self.default.is_some())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered formal parameters of a constructor.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    owner: Option<&'static str>,
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty signature owned by `T`, used in diagnostics.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            owner: Some(std::any::type_name::<T>()),
            params: Vec::new(),
        }
    }

    /// Appends an ordinary parameter of plain type `T`.
    pub fn param<T: ?Sized + 'static>(self, name: &'static str) -> Self {
        self.with(Parameter::of::<T>(name))
    }

    /// Appends an ordinary parameter that may be built just in time.
    pub fn constructible<T: Injectable>(self, name: &'static str) -> Self {
        self.with(Parameter::constructible::<T>(name))
    }

    /// Appends a fully described parameter.
    pub fn with(mut self, parameter: Parameter) -> Self {
        self.params.push(parameter);
        self
    }

    /// Attaches a name tag to an already declared parameter.
    ///
    /// Fails with [`DiError::Name`] when the parameter does not exist or has
    /// no declared type.
    pub fn annotate(mut self, parameter: &str, tag: impl Into<Cow<'static, str>>) -> DiResult<Self> {
        let owner = self.owner.unwrap_or("<anonymous>");
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name == parameter)
            .ok_or_else(|| DiError::Name {
                owner: owner.to_string(),
                parameter: parameter.to_string(),
                message: "no such parameter".to_string(),
            })?;
        if param.ty.is_none() {
            return Err(DiError::Name {
                owner: owner.to_string(),
                parameter: parameter.to_string(),
                message: "parameter has no declared type".to_string(),
            });
        }
        param.name_tag = Some(tag.into());
        Ok(self)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn owner(&self) -> Option<&'static str> {
        self.owner
    }
}

/// Resolved arguments handed to [`Injectable::construct`].
///
/// Positional parameters keep their declaration order, the variadic
/// parameter collects a list, and keyword-only parameters are passed by name.
pub struct Arguments {
    owner: &'static str,
    positional: Vec<(&'static str, Value)>,
    variadic: Vec<Value>,
    keyword: Vec<(&'static str, Value)>,
}

impl Arguments {
    pub(crate) fn new(owner: &'static str) -> Self {
        Self {
            owner,
            positional: Vec::new(),
            variadic: Vec::new(),
            keyword: Vec::new(),
        }
    }

    pub(crate) fn push_positional(&mut self, name: &'static str, value: Value) {
        self.positional.push((name, value));
    }

    pub(crate) fn extend_variadic(&mut self, values: Vec<Value>) {
        self.variadic.extend(values);
    }

    pub(crate) fn push_keyword(&mut self, name: &'static str, value: Value) {
        self.keyword.push((name, value));
    }

    /// Raw value of a named argument.
    pub fn raw(&self, name: &str) -> DiResult<&Value> {
        self.positional
            .iter()
            .chain(self.keyword.iter())
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| DiError::non_injectable(self.owner, format!("no argument named `{}`", name)))
    }

    /// Argument of plain type `T`.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        downcast::<T>(self.raw(name)?)
    }

    /// Argument declared as `Optional<T>`.
    pub fn get_optional<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        downcast_optional::<T>(self.raw(name)?)
    }

    /// Argument declared as `List<T>`.
    pub fn get_list<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Vec<Arc<T>>> {
        downcast_collection::<T>(self.raw(name)?, name)
    }

    /// Argument declared as `Set<T>`: the bound values, each instance once.
    pub fn get_set<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Vec<Arc<T>>> {
        downcast_collection::<T>(self.raw(name)?, name)
    }

    /// Argument declared as `Tuple<T>`.
    pub fn get_tuple<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<[Arc<T>]>> {
        downcast_collection::<T>(self.raw(name)?, name).map(Arc::from)
    }

    /// Argument declared as `ProviderOf<T>`.
    pub fn get_provider<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<ProviderOf<T>> {
        downcast_provider::<T>(self.raw(name)?)
    }

    /// Argument declared as `TypeOf<T>`.
    pub fn get_type(&self, name: &str) -> DiResult<TypeInfo> {
        downcast_type(self.raw(name)?)
    }

    /// Values collected by the variadic parameter.
    pub fn variadic<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        downcast_all::<T>(&self.variadic)
    }

    /// Positional values in declaration order.
    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.positional.iter().map(|(_, v)| v)
    }

    /// Names of the keyword-only arguments.
    pub fn keyword_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.keyword.iter().map(|(n, _)| *n)
    }
}
