use std::collections::HashMap;

use parking_lot::Mutex;

use super::Provider;
use crate::key::Target;

/// Per-state memoization of created providers.
///
/// Entries are written once per target and never removed.
#[derive(Default)]
pub(crate) struct ProviderCache {
    providers: Mutex<HashMap<Target, Provider>>,
}

impl ProviderCache {
    pub(crate) fn get(&self, target: &Target) -> Option<Provider> {
        self.providers.lock().get(target).cloned()
    }

    /// Stores `provider` unless the target already has one; returns the
    /// provider that ends up cached.
    pub(crate) fn insert(&self, target: Target, provider: Provider) -> Provider {
        self.providers.lock().entry(target).or_insert(provider).clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.providers.lock().len()
    }
}
