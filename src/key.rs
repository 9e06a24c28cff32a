//! Target (key) types for the dependency injection container.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::signature::{Constructor, Injectable};

/// Runtime handle for a Rust type used as (part of) a target.
///
/// Equality and hashing use the `TypeId` only; the name is kept for
/// diagnostics and string lookups. A handle created through
/// [`TypeInfo::constructible`] also carries the constructor of the type so
/// that just-in-time bindings can build it without a declared binding.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::TypeInfo;
///
/// let info = TypeInfo::of::<Vec<String>>();
/// assert_eq!(info.simple_name(), "Vec");
/// assert_eq!(info, TypeInfo::of::<Vec<String>>());
/// assert_ne!(info, TypeInfo::of::<Vec<u8>>());
/// ```
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    sized: bool,
    constructor: Option<Constructor>,
}

impl TypeInfo {
    /// Handle for any `'static` type, including trait objects.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            // Pointers to unsized types (trait objects, slices) are fat.
            sized: std::mem::size_of::<*const T>() == std::mem::size_of::<*const ()>(),
            constructor: None,
        }
    }

    /// Handle for an [`Injectable`] type, carrying its constructor.
    pub fn constructible<T: Injectable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            sized: true,
            constructor: Some(Constructor::of::<T>()),
        }
    }

    /// The `TypeId` of the type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full `std::any::type_name` of the type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the type is sized, i.e. not a trait object or slice.
    pub fn is_sized(&self) -> bool {
        self.sized
    }

    /// The constructor, when the handle was created for an injectable type.
    pub fn constructor(&self) -> Option<Constructor> {
        self.constructor
    }

    /// Last path segment of the type name without generic arguments.
    pub fn simple_name(&self) -> &'static str {
        simple_name(self.name)
    }
}

pub(crate) fn simple_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    let base = base.trim_start_matches("dyn ");
    base.rsplit("::").next().unwrap_or(base)
}

impl PartialEq for TypeInfo {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The requested shape of a target.
///
/// Besides plain types, a target may ask for a composite built from the
/// bindings of an element type, or name a type by its unqualified name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// A concrete type or trait object
    Type(TypeInfo),
    /// Every value bound for the element, in declaration order
    List(Box<TargetType>),
    /// The list of the element with duplicate instances removed
    Set(Box<TargetType>),
    /// The list of the element frozen into a fixed-size slice
    Tuple(Box<TargetType>),
    /// The element if it is bound, nothing otherwise
    Optional(Box<TargetType>),
    /// The type handle of whatever is bound for the element
    TypeOf(Box<TargetType>),
    /// A provider producing the element on demand
    ProviderOf(Box<TargetType>),
    /// A type named by its unqualified name, looked up against the registry
    Unresolved(Cow<'static, str>),
}

impl TargetType {
    /// Plain type target.
    pub fn of<T: ?Sized + 'static>() -> Self {
        TargetType::Type(TypeInfo::of::<T>())
    }

    /// Plain type target that can be built just in time.
    pub fn constructible<T: Injectable>() -> Self {
        TargetType::Type(TypeInfo::constructible::<T>())
    }

    pub fn list_of<T: ?Sized + 'static>() -> Self {
        TargetType::List(Box::new(Self::of::<T>()))
    }

    pub fn set_of<T: ?Sized + 'static>() -> Self {
        TargetType::Set(Box::new(Self::of::<T>()))
    }

    pub fn tuple_of<T: ?Sized + 'static>() -> Self {
        TargetType::Tuple(Box::new(Self::of::<T>()))
    }

    pub fn optional_of<T: ?Sized + 'static>() -> Self {
        TargetType::Optional(Box::new(Self::of::<T>()))
    }

    pub fn type_of<T: ?Sized + 'static>() -> Self {
        TargetType::TypeOf(Box::new(Self::of::<T>()))
    }

    pub fn provider_of<T: ?Sized + 'static>() -> Self {
        TargetType::ProviderOf(Box::new(Self::of::<T>()))
    }

    /// Type named by its unqualified name (e.g. `"Database"`).
    pub fn by_name(name: impl Into<Cow<'static, str>>) -> Self {
        TargetType::Unresolved(name.into())
    }

    /// Wraps `self` as the element of a list.
    pub fn list(self) -> Self {
        TargetType::List(Box::new(self))
    }

    /// Wraps `self` as the element of an optional.
    pub fn optional(self) -> Self {
        TargetType::Optional(Box::new(self))
    }

    /// Wraps `self` as the element of a provider.
    pub fn provider(self) -> Self {
        TargetType::ProviderOf(Box::new(self))
    }

    /// The plain type handle, if this is a plain type target.
    pub fn type_info(&self) -> Option<&TypeInfo> {
        match self {
            TargetType::Type(info) => Some(info),
            _ => None,
        }
    }

    /// Name used for string lookups and diagnostics.
    pub fn simple_name(&self) -> &str {
        match self {
            TargetType::Type(info) => info.simple_name(),
            TargetType::Unresolved(name) => simple_name(name),
            TargetType::List(_) => "List",
            TargetType::Set(_) => "Set",
            TargetType::Tuple(_) => "Tuple",
            TargetType::Optional(_) => "Optional",
            TargetType::TypeOf(_) => "TypeOf",
            TargetType::ProviderOf(_) => "ProviderOf",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Type(info) => write!(f, "{}", info),
            TargetType::List(inner) => write!(f, "List<{}>", inner),
            TargetType::Set(inner) => write!(f, "Set<{}>", inner),
            TargetType::Tuple(inner) => write!(f, "Tuple<{}>", inner),
            TargetType::Optional(inner) => write!(f, "Optional<{}>", inner),
            TargetType::TypeOf(inner) => write!(f, "TypeOf<{}>", inner),
            TargetType::ProviderOf(inner) => write!(f, "ProviderOf<{}>", inner),
            TargetType::Unresolved(name) => write!(f, "\"{}\"", name),
        }
    }
}

/// Key for binding storage and lookup: a requested type plus an optional name.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Target, TargetType};
///
/// let unnamed = Target::of::<u32>();
/// let named = Target::named_of::<u32>("port");
/// assert_ne!(unnamed, named);
/// assert_eq!(named.name(), Some("port"));
/// assert_eq!(named.to_string(), "u32 named \"port\"");
/// assert_eq!(Target::new(TargetType::list_of::<u32>()).to_string(), "List<u32>");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    ty: TargetType,
    name: Option<Cow<'static, str>>,
}

impl Target {
    /// Unnamed target for the given shape.
    pub fn new(ty: TargetType) -> Self {
        Self { ty, name: None }
    }

    /// Target for the given shape and name.
    pub fn with_name(ty: TargetType, name: Option<Cow<'static, str>>) -> Self {
        Self { ty, name }
    }

    /// Unnamed plain type target.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TargetType::of::<T>())
    }

    /// Named plain type target.
    pub fn named_of<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_name(TargetType::of::<T>(), Some(name.into()))
    }

    /// Returns a copy of this target with the given name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn target_type(&self) -> &TargetType {
        &self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Same name, different shape.
    pub(crate) fn retyped(&self, ty: TargetType) -> Self {
        Self { ty, name: self.name.clone() }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} named \"{}\"", self.ty, name),
            None => write!(f, "{}", self.ty),
        }
    }
}
