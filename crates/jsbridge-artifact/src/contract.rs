//! Contract identity: supertype + interfaces, content-addressed.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use jsbridge_core::registry::UNIVERSAL_BASE;

/// A requested contract: one supertype and any number of interfaces.
///
/// Interface order is preserved for resolution but never affects the
/// content hash: the same multiset of names always yields the same
/// [`ContractKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub supertype: String,
    pub interfaces: Vec<String>,
}

impl ContractSpec {
    pub fn new(supertype: impl Into<String>, interfaces: &[&str]) -> Self {
        let supertype = supertype.into();
        ContractSpec {
            supertype: if supertype.is_empty() {
                UNIVERSAL_BASE.to_string()
            } else {
                supertype
            },
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Canonical form: all participating type names, trimmed, sorted, and
    /// concatenated. This is the digest input.
    pub fn canonical(&self) -> String {
        let mut names: Vec<&str> = Vec::with_capacity(1 + self.interfaces.len());
        names.push(self.supertype.trim());
        for itf in &self.interfaces {
            names.push(itf.trim());
        }
        names.sort_unstable();
        names.concat()
    }

    /// Content hash of the canonical form.
    pub fn key(&self) -> ContractKey {
        let digest = Sha256::digest(self.canonical().as_bytes());
        ContractKey(digest.into())
    }

    /// Canonical name of the synthesized type for this contract.
    pub fn class_name(&self) -> String {
        format!("pkg.anonymous.K_{}", self.key())
    }
}

/// Fixed-length content hash identifying one contract.
///
/// Doubles as the cache lookup key and the artifact filename stem. Two
/// distinct contracts are assumed to never collide.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractKey([u8; 32]);

impl ContractKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractKey({})", self.to_hex())
    }
}
