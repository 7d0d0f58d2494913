//! Core building blocks for the JsBridge proxy runtime.
//!
//! This crate holds the pieces every other layer depends on:
//!
//! - [`value`]: the boxed [`value::Value`] representation that crosses the
//!   foreign-call boundary, and the [`value::TypeTag`] kind tags.
//! - [`registry`]: the registration table describing which host types a
//!   synthesized proxy can implement.
//! - [`instance`]: proxy instance id allocation and the process-wide
//!   instance registry.
//! - [`bridge`]: the cross-thread dispatch bridge that forwards proxy
//!   method calls onto the scripting engine's designated thread.

pub mod bridge;
pub mod instance;
pub mod registry;
pub mod value;

pub use bridge::{BridgeConfig, DispatchBridge, DispatchOutcome, ForeignEngine};
pub use instance::{IdAllocator, InstanceRegistry, ID_BASE};
pub use registry::{MethodDescriptor, TypeDef, TypeRegistry, UNIVERSAL_BASE};
pub use value::{ObjectRef, TypeTag, Value};
