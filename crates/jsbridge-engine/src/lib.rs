//! Proxy synthesis pipeline for JsBridge.
//!
//! Given a supertype name and a set of interface names, this crate
//! synthesizes a concrete, instantiable proxy type whose every method
//! forwards across the bridge into the scripting engine:
//!
//! 1. [`resolver`] computes the abstract method surface of the contract.
//! 2. [`synthesize`] builds the trampoline-table artifact and lowers it to
//!    its compiled binary form on a worker thread.
//! 3. [`cache`] content-addresses artifacts by contract hash, with an
//!    in-memory tier, a durable-store tier, and a per-key single-flight
//!    gate so an unseen contract is synthesized exactly once.
//! 4. [`loader`] materializes a compiled artifact into a [`LoadedType`]
//!    inside a per-contract load context.
//! 5. [`factory`] ties the stages together behind [`ProxyFactory`].

pub mod cache;
pub mod error;
pub mod factory;
pub mod loader;
pub mod proxy;
pub mod resolver;
pub mod stats;
pub mod synthesize;

pub use cache::ArtifactCache;
pub use error::SynthesisError;
pub use factory::{FactoryConfig, ProxyFactory};
pub use loader::{LoadedType, Loader};
pub use proxy::{ProxyInstance, Trampoline};
pub use stats::{CacheStats, StatsSnapshot};
