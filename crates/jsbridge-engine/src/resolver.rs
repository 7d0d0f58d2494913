//! Contract resolution: from type names to an abstract method surface.

use rustc_hash::FxHashSet;

use jsbridge_artifact::ContractSpec;
use jsbridge_core::registry::{MethodDescriptor, TypeRegistry};

/// Enumerate the methods a proxy for `spec` must implement.
///
/// The supertype's methods come first, then each interface's in submission
/// order. A signature appearing in more than one participating type is
/// kept once (first occurrence wins). An unresolvable type name is logged
/// and skipped; resolution is best-effort and never aborts the request.
pub fn resolve(registry: &TypeRegistry, spec: &ContractSpec) -> Vec<MethodDescriptor> {
    let mut seen = FxHashSet::default();
    let mut surface = Vec::new();

    let names = std::iter::once(spec.supertype.as_str())
        .chain(spec.interfaces.iter().map(String::as_str));
    for name in names {
        let Some(def) = registry.lookup(name) else {
            tracing::warn!(
                target: "jsbridge::resolver",
                type_name = name,
                "type is not registered, skipping its contribution"
            );
            continue;
        };
        for method in def.methods {
            if seen.insert(method.signature()) {
                surface.push(method);
            }
        }
    }

    surface
}
