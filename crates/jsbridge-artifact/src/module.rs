//! Compiled proxy artifact: the loadable trampoline table for one contract.

use thiserror::Error;

use jsbridge_core::registry::MethodDescriptor;
use jsbridge_core::value::TypeTag;
use serde::{Deserialize, Serialize};

use crate::contract::{ContractKey, ContractSpec};
use crate::encode::{ArtifactReader, ArtifactWriter, DecodeError};

/// Magic number for proxy artifact files: "PRXA"
pub const MAGIC: [u8; 4] = *b"PRXA";

/// Current artifact format version
pub const VERSION: u32 = 1;

/// Artifact encoding/decoding errors
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Invalid magic number
    #[error("Invalid magic number: expected PRXA, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported version
    #[error("Unsupported artifact version: {0} (current: {VERSION})")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Unknown type tag byte
    #[error("Unknown type tag byte {0:#x} at method {1}")]
    UnknownTypeTag(u8, String),
}

/// A synthesized, loadable implementation of one contract.
///
/// Holds the contract identity plus one trampoline descriptor per abstract
/// method. Created once per distinct [`ContractKey`] and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyArtifact {
    /// Artifact format version this was synthesized with.
    pub version: u32,
    /// The contract this artifact implements.
    pub contract: ContractSpec,
    /// Trampoline table, one entry per abstract method.
    pub methods: Vec<MethodDescriptor>,
}

impl ProxyArtifact {
    pub fn new(contract: ContractSpec, methods: Vec<MethodDescriptor>) -> Self {
        ProxyArtifact {
            version: VERSION,
            contract,
            methods,
        }
    }

    /// The content key of the implemented contract.
    pub fn key(&self) -> ContractKey {
        self.contract.key()
    }

    /// Canonical name of the type this artifact loads as.
    pub fn class_name(&self) -> String {
        self.contract.class_name()
    }

    /// Encode to the binary format, with a trailing CRC32 over everything
    /// preceding it.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ArtifactWriter::with_capacity(64 + self.methods.len() * 16);
        writer.emit_bytes(&MAGIC);
        writer.emit_u32(self.version);

        writer.emit_string(&self.contract.supertype);
        writer.emit_u32(self.contract.interfaces.len() as u32);
        for itf in &self.contract.interfaces {
            writer.emit_string(itf);
        }

        writer.emit_u32(self.methods.len() as u32);
        for method in &self.methods {
            writer.emit_string(&method.name);
            writer.emit_u8(method.ret.to_u8());
            writer.emit_u16(method.params.len() as u16);
            for p in &method.params {
                writer.emit_u8(p.to_u8());
            }
        }

        let checksum = crc32fast::hash(writer.buffer());
        writer.emit_u32(checksum);
        writer.into_bytes()
    }

    /// Decode from the binary format, validating magic, version, and
    /// checksum.
    pub fn decode(bytes: &[u8]) -> Result<Self, ArtifactError> {
        if bytes.len() < 4 {
            return Err(DecodeError::UnexpectedEnd(bytes.len()).into());
        }
        let (body, tail) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(ArtifactError::ChecksumMismatch { expected, actual });
        }

        let mut reader = ArtifactReader::new(body);
        let magic_bytes = reader.read_bytes(4)?;
        let magic = [magic_bytes[0], magic_bytes[1], magic_bytes[2], magic_bytes[3]];
        if magic != MAGIC {
            return Err(ArtifactError::InvalidMagic(magic));
        }

        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(ArtifactError::UnsupportedVersion(version));
        }

        let supertype = reader.read_string()?;
        let interface_count = reader.read_u32()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            interfaces.push(reader.read_string()?);
        }

        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            let name = reader.read_string()?;
            let ret_byte = reader.read_u8()?;
            let ret = TypeTag::from_u8(ret_byte)
                .ok_or_else(|| ArtifactError::UnknownTypeTag(ret_byte, name.clone()))?;
            let param_count = reader.read_u16()? as usize;
            let mut params = Vec::with_capacity(param_count);
            for _ in 0..param_count {
                let byte = reader.read_u8()?;
                let tag = TypeTag::from_u8(byte)
                    .ok_or_else(|| ArtifactError::UnknownTypeTag(byte, name.clone()))?;
                params.push(tag);
            }
            methods.push(MethodDescriptor { name, params, ret });
        }

        Ok(ProxyArtifact {
            version,
            contract: ContractSpec {
                supertype,
                interfaces,
            },
            methods,
        })
    }
}
