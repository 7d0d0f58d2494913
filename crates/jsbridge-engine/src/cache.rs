//! In-memory artifact cache with per-key single-flight building.
//!
//! The map itself is concurrent, but that alone cannot give at-most-one
//! synthesis per contract: two threads missing the same unseen key would
//! both reach the build path. Each key therefore has a single-flight gate;
//! the first requester builds while later ones block on the gate and then
//! find the loaded type on the double-check.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use jsbridge_artifact::ContractKey;

use crate::error::SynthesisError;
use crate::loader::LoadedType;
use crate::stats::CacheStats;

/// Process-lifetime cache of loaded proxy types, keyed by contract hash.
pub struct ArtifactCache {
    loaded: DashMap<ContractKey, Arc<LoadedType>>,
    inflight: DashMap<ContractKey, Arc<Mutex<()>>>,
    stats: CacheStats,
}

impl ArtifactCache {
    pub fn new() -> Self {
        ArtifactCache {
            loaded: DashMap::new(),
            inflight: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Peek the in-memory tier without building.
    pub fn get(&self, key: &ContractKey) -> Option<Arc<LoadedType>> {
        self.loaded.get(key).map(|entry| entry.clone())
    }

    /// Number of loaded types.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Return the loaded type for `key`, building it at most once.
    ///
    /// `build` runs under the key's gate and covers the slower tiers
    /// (durable store lookup, then full synthesis). A build failure is
    /// returned to the requester that ran it; it leaves no cache entry, so
    /// a later request may try again.
    pub fn get_or_build<F>(&self, key: ContractKey, build: F) -> Result<Arc<LoadedType>, SynthesisError>
    where
        F: FnOnce() -> Result<Arc<LoadedType>, SynthesisError>,
    {
        if let Some(ty) = self.loaded.get(&key) {
            self.stats.record_memory_hit();
            return Ok(ty.clone());
        }

        let gate = self
            .inflight
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = gate.lock();

        // Double check: the winner may have populated the map while we
        // waited on the gate.
        let result = if let Some(ty) = self.loaded.get(&key) {
            self.stats.record_memory_hit();
            Ok(ty.clone())
        } else {
            match build() {
                Ok(ty) => {
                    self.loaded.insert(key, ty.clone());
                    Ok(ty)
                }
                Err(e) => Err(e),
            }
        };

        drop(guard);
        self.inflight.remove(&key);
        result
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use jsbridge_artifact::{ContractSpec, ProxyArtifact};
    use jsbridge_core::bridge::{DispatchBridge, ForeignEngine};
    use jsbridge_core::value::Value;

    use crate::loader::Loader;

    struct NullEngine;

    impl ForeignEngine for NullEngine {
        fn invoke(&self, _method: &str, _args: &[Value]) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    fn loaded_type(spec: &ContractSpec) -> Arc<LoadedType> {
        let loader = Loader::new(Arc::new(DispatchBridge::new(Arc::new(NullEngine))));
        let artifact = ProxyArtifact::new(spec.clone(), vec![]);
        loader.load(artifact.key(), &artifact.encode()).unwrap()
    }

    #[test]
    fn test_build_once_then_memory_hits() {
        let cache = ArtifactCache::new();
        let spec = ContractSpec::new("Object", &[]);
        let key = spec.key();

        let a = cache.get_or_build(key, || Ok(loaded_type(&spec))).unwrap();
        let b = cache
            .get_or_build(key, || panic!("must not rebuild"))
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().snapshot().memory_hits, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_build_leaves_no_entry() {
        let cache = ArtifactCache::new();
        let spec = ContractSpec::new("Object", &[]);
        let key = spec.key();

        let err = cache.get_or_build(key, || {
            Err(SynthesisError::Compile("boom".to_string()))
        });
        assert!(err.is_err());
        assert!(cache.is_empty());

        // The key is buildable again afterwards.
        assert!(cache.get_or_build(key, || Ok(loaded_type(&spec))).is_ok());
    }

    #[test]
    fn test_concurrent_misses_build_exactly_once() {
        let cache = Arc::new(ArtifactCache::new());
        let spec = ContractSpec::new("Object", &[]);
        let key = spec.key();
        let builds = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let spec = spec.clone();
                let builds = builds.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_build(key, || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            Ok(loaded_type(&spec))
                        })
                        .unwrap()
                })
            })
            .collect();

        let types: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for ty in &types[1..] {
            assert!(Arc::ptr_eq(&types[0], ty));
        }
    }
}
