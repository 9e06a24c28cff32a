use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::Scope;
use crate::error::DiResult;
use crate::provider::{Provide, Provider, Value};

/// One value per calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadScope;

struct ThreadScopedProvider {
    inner: Provider,
    values: Mutex<HashMap<ThreadId, Value>>,
}

impl Provide for ThreadScopedProvider {
    fn provide(&self) -> DiResult<Value> {
        let id = thread::current().id();
        if let Some(value) = self.values.lock().get(&id) {
            return Ok(value.clone());
        }
        // Built outside the lock: only this thread can fill its own slot.
        let value = self.inner.get()?;
        Ok(self.values.lock().entry(id).or_insert(value).clone())
    }
}

impl Scope for ThreadScope {
    fn wrap(&self, unscoped: Provider) -> DiResult<Provider> {
        Ok(Provider::new(ThreadScopedProvider {
            inner: unscoped,
            values: Mutex::new(HashMap::new()),
        }))
    }
}
