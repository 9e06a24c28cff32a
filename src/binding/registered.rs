use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use super::{Binding, MultiBinding};
use crate::key::Target;
use crate::registration::BindingRegistry;

static NEXT_MODULE_ID: AtomicUsize = AtomicUsize::new(1);

/// Handle to a configured private module.
///
/// Carries the module's own registry, which becomes the registry of the
/// child injection state its bindings are resolved in.
#[derive(Clone)]
pub struct PrivateModuleRef {
    inner: Arc<PrivateModuleData>,
}

struct PrivateModuleData {
    id: usize,
    name: String,
    registry: Arc<BindingRegistry>,
}

impl PrivateModuleRef {
    pub(crate) fn new(name: String, registry: Arc<BindingRegistry>) -> Self {
        Self {
            inner: Arc::new(PrivateModuleData {
                id: NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed),
                name,
                registry,
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn registry(&self) -> &Arc<BindingRegistry> {
        &self.inner.registry
    }
}

impl PartialEq for PrivateModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for PrivateModuleRef {}

impl fmt::Debug for PrivateModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.inner.name, self.inner.id)
    }
}

/// Private modules a binding traversed, outermost first.
pub type SourcePath = SmallVec<[PrivateModuleRef; 2]>;

/// A binding plus the chain of private modules it became visible through.
#[derive(Clone)]
pub struct RegisteredBinding {
    pub(crate) binding: Binding,
    pub(crate) source_path: SourcePath,
}

impl RegisteredBinding {
    /// Binding declared directly in a public module.
    pub fn new(binding: Binding) -> Self {
        Self {
            binding,
            source_path: SourcePath::new(),
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn target(&self) -> Target {
        self.binding.target()
    }

    pub fn source_path(&self) -> &[PrivateModuleRef] {
        &self.source_path
    }

    /// The same binding seen from outside `module`.
    ///
    /// Items of a multi binding are prefixed too, since each item is resolved
    /// in the state of the module that declared it.
    pub(crate) fn with_prefix(&self, module: &PrivateModuleRef) -> Self {
        let binding = match &self.binding {
            Binding::Multi(multi) => Binding::Multi(MultiBinding {
                registered_items: multi
                    .registered_items
                    .iter()
                    .map(|item| item.with_prefix(module))
                    .collect(),
                ..multi.clone()
            }),
            other => other.clone(),
        };
        let mut source_path = SourcePath::with_capacity(self.source_path.len() + 1);
        source_path.push(module.clone());
        source_path.extend(self.source_path.iter().cloned());
        Self { binding, source_path }
    }
}

impl fmt::Debug for RegisteredBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredBinding")
            .field("binding", &self.binding)
            .field("source_path", &self.source_path)
            .finish()
    }
}
