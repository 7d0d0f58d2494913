//! Loading compiled artifacts into instantiable types.
//!
//! Each distinct contract gets its own load context, cached in an arena
//! keyed by [`ContractKey`]. Repeated loads of the same artifact reuse the
//! context, so the "same" generated type is always the same [`LoadedType`]
//! allocation and type-identity comparisons hold.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use jsbridge_artifact::{ContractKey, ProxyArtifact};
use jsbridge_core::bridge::DispatchBridge;
use jsbridge_core::instance::{IdAllocator, InstanceRegistry};

use crate::error::SynthesisError;
use crate::proxy::{ProxyInstance, Trampoline};

/// An instantiable synthesized type: the materialized trampoline table of
/// one compiled artifact, bound to the dispatch bridge.
pub struct LoadedType {
    class_name: String,
    key: ContractKey,
    trampolines: FxHashMap<String, Trampoline>,
    bridge: Arc<DispatchBridge>,
}

impl LoadedType {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn key(&self) -> ContractKey {
        self.key
    }

    pub fn method_count(&self) -> usize {
        self.trampolines.len()
    }

    pub fn trampoline(&self, method: &str) -> Option<&Trampoline> {
        self.trampolines.get(method)
    }

    pub(crate) fn bridge(&self) -> &DispatchBridge {
        &self.bridge
    }

    /// Create an instance: runs the synthesized constructor (fresh id,
    /// registration) before the instance is published.
    pub fn instantiate(
        self: &Arc<Self>,
        ids: &IdAllocator,
        instances: &InstanceRegistry,
    ) -> Arc<ProxyInstance> {
        ProxyInstance::construct(self.clone(), ids, instances)
    }
}

/// One isolated load context, scoped to a single artifact.
struct LoadContext {
    ty: Arc<LoadedType>,
}

/// Turns compiled artifact bytes into [`LoadedType`]s, one context per
/// distinct contract key.
pub struct Loader {
    contexts: DashMap<ContractKey, Arc<LoadContext>>,
    bridge: Arc<DispatchBridge>,
}

impl Loader {
    pub fn new(bridge: Arc<DispatchBridge>) -> Self {
        Loader {
            contexts: DashMap::new(),
            bridge,
        }
    }

    /// Load (or reuse) the type for `key` from compiled bytes.
    ///
    /// Malformed bytes surface as a load error; the caller gets no type.
    pub fn load(&self, key: ContractKey, bytes: &[u8]) -> Result<Arc<LoadedType>, SynthesisError> {
        if let Some(ctx) = self.contexts.get(&key) {
            return Ok(ctx.ty.clone());
        }

        let artifact = ProxyArtifact::decode(bytes)?;
        let class_name = artifact.class_name();

        let mut trampolines = FxHashMap::default();
        for descriptor in artifact.methods {
            match trampolines.entry(descriptor.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Trampoline::new(descriptor));
                }
                Entry::Occupied(_) => {
                    // Dispatch is by simple name; a second method under the
                    // same name cannot be reached and is dropped.
                    tracing::warn!(
                        target: "jsbridge::loader",
                        class = %class_name,
                        method = %descriptor.name,
                        "duplicate method name in artifact, keeping first"
                    );
                }
            }
        }

        let ty = Arc::new(LoadedType {
            class_name,
            key,
            trampolines,
            bridge: self.bridge.clone(),
        });

        // A racing load of the same key keeps whichever context landed
        // first, preserving a single type identity per contract.
        let ctx = self
            .contexts
            .entry(key)
            .or_insert_with(|| Arc::new(LoadContext { ty }))
            .clone();
        Ok(ctx.ty.clone())
    }

    /// Number of live load contexts.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}
