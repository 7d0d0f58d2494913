//! Proxy instance ids and the process-wide instance registry.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::value::ObjectRef;

/// First id handed out by an [`IdAllocator`]. Ids below this are reserved.
pub const ID_BASE: u64 = 10_000;

/// Monotonic allocator for proxy instance ids.
///
/// Ids start at [`ID_BASE`] and are never reused for the allocator's
/// lifetime. The allocator is injected into whoever instantiates proxies
/// rather than living as ambient global state.
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next: AtomicU64::new(ID_BASE),
        }
    }

    /// Allocate the next id.
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning map from instance id to the live proxy object.
///
/// Entries are weak: the proxy is owned by whatever foreign-engine object
/// wraps it, and a dropped proxy simply stops resolving here. Records are
/// only removed wholesale by [`InstanceRegistry::teardown`].
pub struct InstanceRegistry {
    records: DashMap<u64, Weak<dyn Any + Send + Sync>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        InstanceRegistry {
            records: DashMap::new(),
        }
    }

    /// Register an instance under its id.
    ///
    /// Must be called before any trampoline on the instance can execute;
    /// proxy constructors do this before the instance is published.
    pub fn register(&self, instance: &ObjectRef, id: u64) {
        self.records.insert(id, Arc::downgrade(&instance.0));
    }

    /// Resolve an id to the live instance, if it is still alive.
    pub fn get(&self, id: u64) -> Option<ObjectRef> {
        self.records
            .get(&id)
            .and_then(|weak| weak.upgrade())
            .map(ObjectRef)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    /// Number of records, including ones whose instance has died.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record. Called when the whole bridge is torn down.
    pub fn teardown(&self) {
        self.records.clear();
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_base_and_increase() {
        let ids = IdAllocator::new();
        assert_eq!(ids.allocate(), ID_BASE);
        assert_eq!(ids.allocate(), ID_BASE + 1);
        assert_eq!(ids.allocate(), ID_BASE + 2);
    }

    #[test]
    fn test_allocators_are_independent() {
        let a = IdAllocator::new();
        let b = IdAllocator::new();
        a.allocate();
        assert_eq!(b.allocate(), ID_BASE);
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = InstanceRegistry::new();
        let instance = Arc::new(String::from("proxy"));
        let handle = ObjectRef::from_arc(instance.clone());

        registry.register(&handle, ID_BASE);
        let resolved = registry.get(ID_BASE).unwrap();
        assert!(resolved.ptr_eq(&handle));
        assert!(!registry.contains(ID_BASE + 1));
    }

    #[test]
    fn test_records_are_weak() {
        let registry = InstanceRegistry::new();
        {
            let instance = Arc::new(42u32);
            registry.register(&ObjectRef::from_arc(instance), ID_BASE);
        }
        // The record remains but no longer resolves.
        assert_eq!(registry.len(), 1);
        assert!(registry.get(ID_BASE).is_none());
    }

    #[test]
    fn test_teardown_clears_records() {
        let registry = InstanceRegistry::new();
        let instance = Arc::new(1u8);
        registry.register(&ObjectRef::from_arc(instance.clone()), ID_BASE);
        assert_eq!(registry.len(), 1);

        registry.teardown();
        assert!(registry.is_empty());
        assert!(registry.get(ID_BASE).is_none());
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let ids = Arc::new(IdAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ids = ids.clone();
            handles.push(std::thread::spawn(move || {
                (0..100).map(|_| ids.allocate()).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 800);
    }
}
