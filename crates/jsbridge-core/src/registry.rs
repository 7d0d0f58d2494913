//! Registration table describing host types the bridge can implement.
//!
//! There is no runtime reflection here: a supertype or interface becomes
//! implementable by a synthesized proxy once its abstract method surface has
//! been registered as a [`TypeDef`]. Only public, non-static, abstract
//! methods belong in a `TypeDef`; that filter is the registrant's contract,
//! the registry itself stores what it is given.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::value::TypeTag;

/// Name of the universal base type. Contributes no methods.
pub const UNIVERSAL_BASE: &str = "Object";

/// Descriptor of a single abstract instance method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Simple method name, as dispatched to the scripting engine.
    pub name: String,
    /// Ordered argument kinds.
    pub params: Vec<TypeTag>,
    /// Declared return kind.
    pub ret: TypeTag,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<TypeTag>, ret: TypeTag) -> Self {
        MethodDescriptor {
            name: name.into(),
            params,
            ret,
        }
    }

    /// Canonical signature string, e.g. `compare(II)I` or `run()V`.
    ///
    /// Two methods with equal signatures are the same method for
    /// deduplication purposes, regardless of which type contributed them.
    pub fn signature(&self) -> String {
        let mut sig = String::with_capacity(self.name.len() + self.params.len() + 3);
        sig.push_str(&self.name);
        sig.push('(');
        for p in &self.params {
            sig.push(p.code());
        }
        sig.push(')');
        sig.push(self.ret.code());
        sig
    }
}

/// The registered abstract method surface of one host type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Fully qualified type name.
    pub name: String,
    /// Abstract instance methods, in declaration order.
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, methods: Vec<MethodDescriptor>) -> Self {
        TypeDef {
            name: name.into(),
            methods,
        }
    }
}

/// Concurrent name-keyed table of registered host types.
///
/// The universal base type is pre-registered with an empty method list, so
/// a contract naming only it resolves to a zero-method surface.
pub struct TypeRegistry {
    types: DashMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let registry = TypeRegistry {
            types: DashMap::new(),
        };
        registry.register(TypeDef::new(UNIVERSAL_BASE, Vec::new()));
        registry
    }

    /// Register (or replace) a type definition.
    pub fn register(&self, def: TypeDef) {
        self.types.insert(def.name.clone(), def);
    }

    /// Convenience for registering an interface by name.
    pub fn register_interface(&self, name: impl Into<String>, methods: Vec<MethodDescriptor>) {
        self.register(TypeDef::new(name, methods));
    }

    /// Look up a type definition by name.
    pub fn lookup(&self, name: &str) -> Option<TypeDef> {
        self.types.get(name).map(|entry| entry.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of registered types, including the universal base.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_strings() {
        let run = MethodDescriptor::new("run", vec![], TypeTag::Void);
        assert_eq!(run.signature(), "run()V");

        let compare = MethodDescriptor::new("compare", vec![TypeTag::I32, TypeTag::I32], TypeTag::I32);
        assert_eq!(compare.signature(), "compare(II)I");

        let mixed = MethodDescriptor::new(
            "accept",
            vec![TypeTag::Bool, TypeTag::F64, TypeTag::Ref],
            TypeTag::Ref,
        );
        assert_eq!(mixed.signature(), "accept(ZDL)L");
    }

    #[test]
    fn test_universal_base_preregistered() {
        let registry = TypeRegistry::new();
        let base = registry.lookup(UNIVERSAL_BASE).unwrap();
        assert!(base.methods.is_empty());
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = TypeRegistry::new();
        registry.register_interface(
            "Runnable",
            vec![MethodDescriptor::new("run", vec![], TypeTag::Void)],
        );

        assert!(registry.contains("Runnable"));
        let def = registry.lookup("Runnable").unwrap();
        assert_eq!(def.methods.len(), 1);
        assert_eq!(def.methods[0].signature(), "run()V");

        assert!(registry.lookup("Missing").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let registry = TypeRegistry::new();
        registry.register_interface("Callback", vec![]);
        registry.register_interface(
            "Callback",
            vec![MethodDescriptor::new("call", vec![], TypeTag::Void)],
        );
        assert_eq!(registry.lookup("Callback").unwrap().methods.len(), 1);
    }
}
