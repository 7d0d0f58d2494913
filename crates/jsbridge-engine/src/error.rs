//! Synthesis pipeline error types.

use jsbridge_artifact::{ArtifactError, StoreError};

/// Errors that can occur while synthesizing, compiling, persisting, or
/// loading a proxy type. Every variant is terminal for the current request
/// and never crashes the process; the public factory surface logs it and
/// yields no instance.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The compile stage failed or its worker panicked
    #[error("Compile error: {0}")]
    Compile(String),

    /// Compiled bytes were present but could not be loaded
    #[error("Load error: {0}")]
    Load(#[from] ArtifactError),

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
