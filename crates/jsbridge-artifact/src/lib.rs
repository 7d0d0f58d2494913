//! Contract identity and compiled artifact handling for JsBridge.
//!
//! A contract (supertype plus interfaces) is content-addressed by a stable
//! digest ([`contract`]), lowered to a binary trampoline-table artifact
//! ([`module`], [`encode`]), and persisted across process runs by the
//! durable store ([`store`]).

pub mod contract;
pub mod encode;
pub mod module;
pub mod store;

pub use contract::{ContractKey, ContractSpec};
pub use encode::{ArtifactReader, ArtifactWriter, DecodeError};
pub use module::{ArtifactError, ProxyArtifact, MAGIC, VERSION};
pub use store::{ArtifactStore, StoreError};
