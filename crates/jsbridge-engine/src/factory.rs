//! Top-level synthesis API tying the pipeline stages together.

use std::path::PathBuf;
use std::sync::Arc;

use jsbridge_artifact::{ArtifactStore, ContractKey, ContractSpec};
use jsbridge_core::bridge::{BridgeConfig, DispatchBridge, ForeignEngine};
use jsbridge_core::instance::{IdAllocator, InstanceRegistry};
use jsbridge_core::registry::TypeRegistry;

use crate::cache::ArtifactCache;
use crate::error::SynthesisError;
use crate::loader::{LoadedType, Loader};
use crate::proxy::ProxyInstance;
use crate::resolver;
use crate::stats::StatsSnapshot;
use crate::synthesize;

/// Configuration for a [`ProxyFactory`].
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Root directory of the durable artifact storage.
    pub storage_root: PathBuf,
    /// Whether initialization clears artifact storage left by earlier runs.
    pub clear_on_init: bool,
    /// Wait parameters for the dispatch bridge.
    pub bridge: BridgeConfig,
}

impl FactoryConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        FactoryConfig {
            storage_root: storage_root.into(),
            clear_on_init: false,
            bridge: BridgeConfig::default(),
        }
    }
}

/// Synthesizes, caches, and instantiates proxy types for a scripting
/// engine.
///
/// The factory owns the whole pipeline: the type registry describing
/// implementable contracts, the artifact cache and durable store, the
/// loader arena, the instance registry, and the dispatch bridge with the
/// engine's designated thread.
pub struct ProxyFactory {
    registry: Arc<TypeRegistry>,
    instances: Arc<InstanceRegistry>,
    ids: IdAllocator,
    bridge: Arc<DispatchBridge>,
    loader: Loader,
    cache: ArtifactCache,
    store: ArtifactStore,
}

impl ProxyFactory {
    /// Create a factory, initializing its storage layout.
    pub fn new(
        engine: Arc<dyn ForeignEngine>,
        config: FactoryConfig,
    ) -> Result<Self, SynthesisError> {
        let store = ArtifactStore::new(&config.storage_root);
        store.init(config.clear_on_init)?;

        let bridge = Arc::new(DispatchBridge::with_config(engine, config.bridge));

        Ok(ProxyFactory {
            registry: Arc::new(TypeRegistry::new()),
            instances: Arc::new(InstanceRegistry::new()),
            ids: IdAllocator::new(),
            loader: Loader::new(bridge.clone()),
            bridge,
            cache: ArtifactCache::new(),
            store,
        })
    }

    /// The registration table of implementable host types.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The live proxy instance registry.
    pub fn instances(&self) -> &InstanceRegistry {
        &self.instances
    }

    pub fn bridge(&self) -> &Arc<DispatchBridge> {
        &self.bridge
    }

    /// Cache tier counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.cache.stats().snapshot()
    }

    /// Number of live load contexts (one per distinct contract).
    pub fn loaded_contexts(&self) -> usize {
        self.loader.context_count()
    }

    /// Synthesize (or reuse) the proxy type for a contract and create an
    /// instance of it. Returns `None` on any pipeline failure, which is
    /// logged; the failure never crosses the boundary as an error value.
    pub fn new_instance(&self, supertype: &str, interfaces: &[&str]) -> Option<Arc<ProxyInstance>> {
        match self.try_new_instance(supertype, interfaces) {
            Ok(instance) => Some(instance),
            Err(e) => {
                tracing::error!(
                    target: "jsbridge::factory",
                    supertype,
                    error = %e,
                    "proxy synthesis failed"
                );
                None
            }
        }
    }

    /// As [`Self::new_instance`], but surfacing the failure.
    pub fn try_new_instance(
        &self,
        supertype: &str,
        interfaces: &[&str],
    ) -> Result<Arc<ProxyInstance>, SynthesisError> {
        let spec = ContractSpec::new(supertype, interfaces);
        let key = spec.key();
        let ty = self
            .cache
            .get_or_build(key, || self.build_type(&spec, key))?;
        Ok(ty.instantiate(&self.ids, &self.instances))
    }

    /// Drop all instance records. Loaded types and persisted artifacts
    /// stay valid for the process's lifetime.
    pub fn teardown(&self) {
        self.instances.teardown();
    }

    /// The slow tiers, run under the contract's single-flight gate:
    /// durable store first, full synthesis only on a true miss.
    fn build_type(
        &self,
        spec: &ContractSpec,
        key: ContractKey,
    ) -> Result<Arc<LoadedType>, SynthesisError> {
        if let Some(bytes) = self.store.read(&key)? {
            tracing::debug!(
                target: "jsbridge::factory",
                key = %key,
                "loading previously compiled artifact from storage"
            );
            let ty = self.loader.load(key, &bytes)?;
            self.cache.stats().record_store_hit();
            return Ok(ty);
        }

        let methods = resolver::resolve(&self.registry, spec);
        let artifact = synthesize::synthesize(spec, methods);
        self.store.write_gen_dump(&artifact)?;

        let bytes = synthesize::compile(&artifact)?;
        self.store.write(&key, &bytes)?;
        self.cache.stats().record_synthesis();

        self.loader.load(key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsbridge_core::value::Value;

    struct NullEngine;

    impl ForeignEngine for NullEngine {
        fn invoke(&self, _method: &str, _args: &[Value]) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_factory_creates_storage_layout() {
        let dir = tempfile::tempdir().unwrap();
        let factory =
            ProxyFactory::new(Arc::new(NullEngine), FactoryConfig::new(dir.path())).unwrap();
        assert!(dir.path().join("cache").is_dir());
        assert_eq!(factory.stats(), StatsSnapshot::default());
    }

    #[test]
    fn test_factory_rejects_unusable_storage_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"occupied").unwrap();

        let result = ProxyFactory::new(Arc::new(NullEngine), FactoryConfig::new(&file));
        assert!(matches!(result, Err(SynthesisError::Store(_))));
    }

    #[test]
    fn test_new_instance_swallows_failure() {
        // Force an IO failure after construction by replacing the cache
        // directory with a file.
        let dir = tempfile::tempdir().unwrap();
        let factory =
            ProxyFactory::new(Arc::new(NullEngine), FactoryConfig::new(dir.path())).unwrap();
        std::fs::remove_dir_all(dir.path().join("cache")).unwrap();
        std::fs::write(dir.path().join("cache"), b"occupied").unwrap();

        assert!(factory.new_instance("Object", &[]).is_none());
    }
}
