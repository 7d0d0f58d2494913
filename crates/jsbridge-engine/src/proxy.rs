//! Synthesized proxy instances and their trampoline methods.

use std::sync::Arc;

use jsbridge_core::bridge::{DispatchBridge, DispatchOutcome};
use jsbridge_core::instance::{IdAllocator, InstanceRegistry};
use jsbridge_core::registry::MethodDescriptor;
use jsbridge_core::value::{ObjectRef, TypeTag, Value};

use crate::loader::LoadedType;

/// One synthesized method body: marshals its own call into a foreign
/// dispatch and returns the foreign result.
pub struct Trampoline {
    descriptor: MethodDescriptor,
}

impl Trampoline {
    pub(crate) fn new(descriptor: MethodDescriptor) -> Self {
        Trampoline { descriptor }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Marshal `[native_id, self, args...]` and dispatch through the
    /// entry point matching the declared return kind.
    pub(crate) fn invoke(
        &self,
        bridge: &DispatchBridge,
        native_id: u64,
        self_ref: ObjectRef,
        args: &[Value],
    ) -> DispatchOutcome {
        let d = &self.descriptor;
        if args.len() != d.params.len() {
            return DispatchOutcome::EngineError(format!(
                "{}: expected {} arguments, got {}",
                d.name,
                d.params.len(),
                args.len()
            ));
        }
        for (i, (value, tag)) in args.iter().zip(&d.params).enumerate() {
            if !value.matches_tag(*tag) {
                return DispatchOutcome::EngineError(format!(
                    "{}: argument {} is {} where {} was declared",
                    d.name,
                    i,
                    value.tag(),
                    tag
                ));
            }
        }

        let mut vector = Vec::with_capacity(2 + args.len());
        vector.push(Value::I64(native_id as i64));
        vector.push(Value::Ref(self_ref));
        vector.extend_from_slice(args);

        bridge.dispatch_for(d.ret, &d.name, vector)
    }
}

/// A live instance of a synthesized proxy type.
///
/// Owned by whatever foreign-engine object wraps it; the instance registry
/// only holds a weak back-reference under the instance's id.
pub struct ProxyInstance {
    native_id: u64,
    ty: Arc<LoadedType>,
}

impl ProxyInstance {
    /// The synthesized constructor: allocate a fresh id and register the
    /// instance under it before anything else can observe it.
    pub(crate) fn construct(
        ty: Arc<LoadedType>,
        ids: &IdAllocator,
        instances: &InstanceRegistry,
    ) -> Arc<ProxyInstance> {
        let native_id = ids.allocate();
        let instance = Arc::new(ProxyInstance { native_id, ty });
        instances.register(&ObjectRef::from_arc(instance.clone()), native_id);
        instance
    }

    pub fn native_id(&self) -> u64 {
        self.native_id
    }

    pub fn class_name(&self) -> &str {
        self.ty.class_name()
    }

    pub fn loaded_type(&self) -> &Arc<LoadedType> {
        &self.ty
    }

    /// Invoke an interface method, exposing the tagged dispatch outcome.
    pub fn invoke_checked(self: &Arc<Self>, method: &str, args: &[Value]) -> DispatchOutcome {
        match self.ty.trampoline(method) {
            Some(t) => t.invoke(
                self.ty.bridge(),
                self.native_id,
                ObjectRef::from_arc(self.clone()),
                args,
            ),
            None => DispatchOutcome::EngineError(format!(
                "{}: no such method on {}",
                method,
                self.class_name()
            )),
        }
    }

    /// Invoke an interface method the way generated code does: a degraded
    /// round trip collapses to the declared return kind's zero value.
    pub fn invoke(self: &Arc<Self>, method: &str, args: &[Value]) -> Value {
        let ret = self
            .ty
            .trampoline(method)
            .map(|t| t.descriptor().ret)
            .unwrap_or(TypeTag::Ref);
        self.invoke_checked(method, args).into_value(ret, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsbridge_core::bridge::ForeignEngine;

    struct NullEngine;

    impl ForeignEngine for NullEngine {
        fn invoke(&self, _method: &str, _args: &[Value]) -> Result<Value, String> {
            Ok(Value::Null)
        }
    }

    fn bridge() -> DispatchBridge {
        DispatchBridge::new(Arc::new(NullEngine))
    }

    #[test]
    fn test_trampoline_rejects_wrong_arity() {
        let t = Trampoline::new(MethodDescriptor::new("run", vec![], TypeTag::Void));
        let outcome = t.invoke(&bridge(), 10_000, ObjectRef::new(()), &[Value::I32(1)]);
        match outcome {
            DispatchOutcome::EngineError(msg) => assert!(msg.contains("expected 0 arguments")),
            other => panic!("expected arity error, got {:?}", other),
        }
    }

    #[test]
    fn test_trampoline_rejects_wrong_kind() {
        let t = Trampoline::new(MethodDescriptor::new(
            "accept",
            vec![TypeTag::I64],
            TypeTag::Void,
        ));
        let outcome = t.invoke(&bridge(), 10_000, ObjectRef::new(()), &[Value::I32(1)]);
        match outcome {
            DispatchOutcome::EngineError(msg) => assert!(msg.contains("argument 0")),
            other => panic!("expected kind error, got {:?}", other),
        }
    }

    #[test]
    fn test_trampoline_accepts_null_for_ref_param() {
        let t = Trampoline::new(MethodDescriptor::new(
            "accept",
            vec![TypeTag::Ref],
            TypeTag::Void,
        ));
        let outcome = t.invoke(&bridge(), 10_000, ObjectRef::new(()), &[Value::Null]);
        assert_eq!(outcome, DispatchOutcome::Completed(Value::Null));
    }
}
