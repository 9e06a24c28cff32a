//! Error types for the dependency injection container.

use thiserror::Error;

/// Dependency injection errors
///
/// Represents the various error conditions that can occur while declaring
/// bindings, building an [`Injector`](crate::Injector), or resolving targets
/// from it.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{DiError, Injector};
///
/// let injector = Injector::new(Vec::new()).unwrap();
/// match injector.get::<String>() {
///     Err(DiError::NoBindingFound(target)) => {
///         assert_eq!(target, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_wire::DiError;
///
/// let cyclic = DiError::Cyclic(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(cyclic.to_string(), "cyclic dependency: A -> B -> A");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// No binding and no applicable fallback for the target
    #[error("no binding found for {0}")]
    NoBindingFound(String),
    /// A concrete wiring problem while building `target`
    #[error("cannot inject {target}: {reason}")]
    NonInjectableType {
        /// The target being constructed
        target: String,
        /// What went wrong
        reason: String,
    },
    /// Structural error in a binding declaration
    #[error("invalid binding{}: {message}", format_source_path(.source_path))]
    Binding {
        /// What is wrong with the declaration
        message: String,
        /// Modules the binding was declared through, outermost first
        source_path: Vec<String>,
    },
    /// Construction revisited a target (includes the chain)
    #[error("cyclic dependency: {}", .0.join(" -> "))]
    Cyclic(Vec<String>),
    /// A name tag refers to an unknown or untyped parameter
    #[error("cannot name parameter `{parameter}` of {owner}: {message}")]
    Name {
        /// Type owning the signature
        owner: String,
        /// Parameter the tag was applied to
        parameter: String,
        /// Why the tag is invalid
        message: String,
    },
    /// Type downcast failed
    #[error("type mismatch for {0}")]
    TypeMismatch(String),
    /// Internal: a provider factory refused the current target
    #[error("incompatible provider factory")]
    IncompatibleProviderFactory,
}

fn format_source_path(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" (declared in {})", path.join(" > "))
    }
}

impl DiError {
    pub(crate) fn non_injectable(target: impl ToString, reason: impl Into<String>) -> Self {
        DiError::NonInjectableType {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn binding(message: impl Into<String>) -> Self {
        DiError::Binding {
            message: message.into(),
            source_path: Vec::new(),
        }
    }

    /// Returns true for [`DiError::NoBindingFound`].
    ///
    /// Optional targets and parameter defaults only swallow this kind; every
    /// other error propagates unchanged.
    pub fn is_no_binding(&self) -> bool {
        matches!(self, DiError::NoBindingFound(_))
    }

    /// Returns true for the internal refusal signal of the provider-factory chain.
    pub(crate) fn is_refusal(&self) -> bool {
        matches!(self, DiError::IncompatibleProviderFactory)
    }

    /// Prepends a module name to the source path of a [`DiError::Binding`].
    pub(crate) fn within_module(self, module: &str) -> Self {
        match self {
            DiError::Binding { message, mut source_path } => {
                source_path.insert(0, module.to_string());
                DiError::Binding { message, source_path }
            }
            other => other,
        }
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-wire.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::NoBindingFound("some_service".to_string()))
/// }
///
/// assert!(failing_operation().unwrap_err().is_no_binding());
/// ```
pub type DiResult<T> = Result<T, DiError>;
