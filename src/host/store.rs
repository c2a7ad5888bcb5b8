/*!
Store of built-in providers.

Maps a provider name to its external entry point so the host can load it
by name. The built-in FIPS provider is registered on first use.
*/

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use once_cell::sync::Lazy;

use crate::constants::BUILTIN_PROVIDER;
use crate::provider::{ProviderInitFn, provider_init};

/// Registry of providers the host can load by name
pub struct ProviderStore {
    builtins: HashMap<String, ProviderInitFn>,
}

impl ProviderStore {
    /// Create a store holding the default providers
    fn new() -> Self {
        let mut store = Self {
            builtins: HashMap::new(),
        };

        store.register(BUILTIN_PROVIDER, provider_init);

        store
    }

    fn register(&mut self, name: &str, init: ProviderInitFn) {
        self.builtins.insert(name.to_ascii_lowercase(), init);
    }

    /// Entry point registered under `name`, case-insensitively
    pub fn lookup(&self, name: &str) -> Option<ProviderInitFn> {
        self.builtins.get(&name.to_ascii_lowercase()).copied()
    }

    /// Names of all registered providers, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.keys().cloned().collect();
        names.sort();
        names
    }
}

// Global store instance
static STORE: Lazy<RwLock<ProviderStore>> = Lazy::new(|| RwLock::new(ProviderStore::new()));

/// Read access to the global store
pub fn store() -> RwLockReadGuard<'static, ProviderStore> {
    STORE.read().unwrap_or_else(PoisonError::into_inner)
}

/// Register an additional built-in provider, replacing any with that name
pub fn register_builtin(name: &str, init: ProviderInitFn) {
    let mut store = STORE.write().unwrap_or_else(PoisonError::into_inner);
    store.register(name, init);
}

/// Entry point for a provider by name
pub fn lookup(name: &str) -> Option<ProviderInitFn> {
    store().lookup(name)
}

/// Names of all built-in providers
pub fn list_builtins() -> Vec<String> {
    store().names()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CoreDispatch, CoreHandle, FunctionTable};
    use crate::error::NegotiationError;
    use crate::provider::Negotiated;

    fn never(_handle: &CoreHandle, _table: FunctionTable<'_, CoreDispatch>) -> Result<Negotiated, NegotiationError> {
        Err(NegotiationError::InvalidConfig("test provider".into()))
    }

    #[test]
    fn test_fips_is_builtin() {
        assert!(lookup("fips").is_some());
        assert!(lookup("FIPS").is_some());
        assert!(list_builtins().contains(&"fips".to_string()));
    }

    #[test]
    fn test_register_and_lookup() {
        register_builtin("store-test", never);
        assert!(lookup("store-test").is_some());
        assert!(lookup("missing").is_none());
    }
}
