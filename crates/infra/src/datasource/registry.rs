use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rowgate_core::GuardResult;

/// Process-wide tenant key → pool map.
///
/// Registration is insert-if-absent: the existence check and the insert
/// happen under one write lock, so concurrent first calls for the same tenant
/// build exactly one pool and an existing entry is never replaced.
#[derive(Debug)]
pub struct DataSourceRegistry<P> {
    pools: RwLock<HashMap<String, P>>,
}

impl<P> Default for DataSourceRegistry<P> {
    fn default() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
        }
    }
}

impl<P: Clone> DataSourceRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank keys are never registered.
    pub fn contains(&self, tenant_key: &str) -> bool {
        if tenant_key.trim().is_empty() {
            return false;
        }
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tenant_key)
    }

    pub fn get(&self, tenant_key: &str) -> Option<P> {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_key)
            .cloned()
    }

    /// Return the pool registered for `tenant_key`, building and registering
    /// one with `create` only if none exists. The flag reports whether
    /// `create` ran.
    pub fn get_or_try_insert_with(
        &self,
        tenant_key: &str,
        create: impl FnOnce() -> GuardResult<P>,
    ) -> GuardResult<(P, bool)> {
        if let Some(existing) = self.get(tenant_key) {
            return Ok((existing, false));
        }

        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = pools.get(tenant_key) {
            return Ok((existing.clone(), false));
        }
        let pool = create()?;
        pools.insert(tenant_key.to_string(), pool.clone());
        Ok((pool, true))
    }

    pub fn remove(&self, tenant_key: &str) -> Option<P> {
        self.pools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tenant_key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.pools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use rowgate_core::GuardError;

    #[test]
    fn existing_entry_is_reused_not_replaced() {
        let registry = DataSourceRegistry::new();
        let (first, created) = registry.get_or_try_insert_with("5", || Ok("pool-a")).unwrap();
        assert!(created);
        let (second, created) = registry.get_or_try_insert_with("5", || Ok("pool-b")).unwrap();
        assert!(!created);
        assert_eq!(first, "pool-a");
        assert_eq!(second, "pool-a");
    }

    #[test]
    fn failed_creation_leaves_no_entry() {
        let registry: DataSourceRegistry<&str> = DataSourceRegistry::new();
        let err = registry
            .get_or_try_insert_with("5", || Err(GuardError::datasource_creation("p", "boom")))
            .unwrap_err();
        assert!(matches!(err, GuardError::DataSourceCreation { .. }));
        assert!(!registry.contains("5"));
    }

    #[test]
    fn blank_key_is_not_found() {
        let registry: DataSourceRegistry<&str> = DataSourceRegistry::new();
        assert!(!registry.contains(""));
        assert!(!registry.contains("   "));
    }

    #[test]
    fn racing_registrations_create_once() {
        let registry = Arc::new(DataSourceRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                let created = created.clone();
                thread::spawn(move || {
                    registry
                        .get_or_try_insert_with("7", || {
                            created.fetch_add(1, Ordering::SeqCst);
                            Ok(7u32)
                        })
                        .unwrap()
                })
            })
            .collect();

        for t in threads {
            assert_eq!(t.join().unwrap().0, 7);
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.keys(), vec!["7".to_string()]);
    }
}
