//! Code synthesis and the compile stage.
//!
//! Synthesis builds the trampoline-table artifact for a resolved contract;
//! the compile stage lowers it to loadable bytes. Compilation runs on a
//! spawned worker thread that the initiating thread joins, so a panic in
//! the lowering never takes the caller down with it.

use std::thread;

use jsbridge_artifact::{ContractSpec, ProxyArtifact};
use jsbridge_core::registry::MethodDescriptor;

use crate::error::SynthesisError;

/// Build the loadable artifact body for a contract.
///
/// One trampoline entry per abstract method; the constructor behavior
/// (id allocation + registration) is implicit in every loaded type and
/// carries no per-contract data.
pub fn synthesize(contract: &ContractSpec, methods: Vec<MethodDescriptor>) -> ProxyArtifact {
    tracing::debug!(
        target: "jsbridge::synthesize",
        class = %contract.class_name(),
        methods = methods.len(),
        "synthesizing proxy artifact"
    );
    ProxyArtifact::new(contract.clone(), methods)
}

/// Lower an artifact to its compiled binary form.
///
/// Join semantics: the worker is not cancellable, the caller blocks until
/// it finishes.
pub fn compile(artifact: &ProxyArtifact) -> Result<Vec<u8>, SynthesisError> {
    let artifact = artifact.clone();
    let worker = thread::Builder::new()
        .name("jsbridge-compile".to_string())
        .spawn(move || artifact.encode())
        .map_err(|e| SynthesisError::Compile(format!("failed to spawn compile worker: {}", e)))?;

    worker
        .join()
        .map_err(|_| SynthesisError::Compile("compile worker panicked".to_string()))
}
