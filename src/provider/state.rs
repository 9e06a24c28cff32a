use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use super::cache::ProviderCache;
use crate::binding::{PrivateModuleRef, RegisteredBinding};
use crate::config::InjectorOptions;
use crate::error::DiResult;
use crate::key::Target;
use crate::registration::BindingRegistry;

/// Resolution unit of the root module or of one private module.
///
/// A child state holds the registry of its private module and falls back to
/// its parent for targets it does not bind. Children are owned by their
/// parent; the parent link is weak.
pub(crate) struct InjectionState {
    registry: Arc<BindingRegistry>,
    options: InjectorOptions,
    parent: Option<Weak<InjectionState>>,
    provider_cache: ProviderCache,
    private_states: Mutex<HashMap<usize, Arc<InjectionState>>>,
    creation_lock: Arc<ReentrantMutex<()>>,
}

impl InjectionState {
    pub(crate) fn root(registry: Arc<BindingRegistry>, options: InjectorOptions) -> Self {
        Self {
            registry,
            options,
            parent: None,
            provider_cache: ProviderCache::default(),
            private_states: Mutex::new(HashMap::new()),
            creation_lock: Arc::new(ReentrantMutex::new(())),
        }
    }

    pub(crate) fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub(crate) fn options(&self) -> &InjectorOptions {
        &self.options
    }

    pub(crate) fn parent(&self) -> Option<Arc<InjectionState>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn provider_cache(&self) -> &ProviderCache {
        &self.provider_cache
    }

    /// Lock serializing provider creation across the whole state tree.
    pub(crate) fn creation_lock(&self) -> &ReentrantMutex<()> {
        &self.creation_lock
    }

    /// State of a private module installed here, created on first use.
    pub(crate) fn private_state(self: &Arc<Self>, module: &PrivateModuleRef) -> Arc<InjectionState> {
        self.private_states
            .lock()
            .entry(module.id())
            .or_insert_with(|| {
                Arc::new(InjectionState {
                    registry: module.registry().clone(),
                    options: self.options.clone(),
                    parent: Some(Arc::downgrade(self)),
                    provider_cache: ProviderCache::default(),
                    private_states: Mutex::new(HashMap::new()),
                    creation_lock: self.creation_lock.clone(),
                })
            })
            .clone()
    }

    /// Nearest state, starting here, whose registry binds `target`.
    pub(crate) fn find_binding(
        self: &Arc<Self>,
        target: &Target,
    ) -> DiResult<Option<(Arc<InjectionState>, RegisteredBinding)>> {
        let mut state = Some(self.clone());
        while let Some(current) = state {
            if let Some(registered) = current.registry.get(target)? {
                let registered = registered.clone();
                return Ok(Some((current, registered)));
            }
            state = current.parent();
        }
        Ok(None)
    }
}

impl fmt::Debug for InjectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionState")
            .field("bindings", &self.registry.len())
            .field("providers", &self.provider_cache.len())
            .field("private_states", &self.private_states.lock().len())
            .field("is_root", &self.parent.is_none())
            .finish()
    }
}
