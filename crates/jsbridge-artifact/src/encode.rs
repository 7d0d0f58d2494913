//! Binary encoding primitives for the artifact format.

use thiserror::Error;

/// Errors that can occur while decoding an artifact byte stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Unexpected end of the byte stream
    #[error("Unexpected end of artifact data at offset {0}")]
    UnexpectedEnd(usize),

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string at offset {0}")]
    InvalidUtf8(usize),
}

/// Little-endian writer for artifact bytes.
pub struct ArtifactWriter {
    pub(crate) buffer: Vec<u8>,
}

impl ArtifactWriter {
    pub fn new() -> Self {
        ArtifactWriter { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ArtifactWriter {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emit a length-prefixed UTF-8 string (u32 length + bytes).
    pub fn emit_string(&mut self, value: &str) {
        self.emit_u32(value.len() as u32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

impl Default for ArtifactWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Little-endian reader over artifact bytes.
pub struct ArtifactReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ArtifactReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        ArtifactReader {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        if self.position >= self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let value = self.buffer[self.position];
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_array::<2>()?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a length-prefixed UTF-8 string (u32 length + bytes).
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u32()? as usize;
        if self.position + len > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(self.position - len))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, DecodeError> {
        if self.position + count > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let bytes = self.buffer[self.position..self.position + count].to_vec();
        self.position += count;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        if self.position + N > self.buffer.len() {
            return Err(DecodeError::UnexpectedEnd(self.position));
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_roundtrip() {
        let mut writer = ArtifactWriter::new();
        writer.emit_u8(0x42);
        writer.emit_u16(0x1234);
        writer.emit_u32(0xABCD_EF01);

        let mut reader = ArtifactReader::new(writer.buffer());
        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xABCD_EF01);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut writer = ArtifactWriter::new();
        writer.emit_u16(0x1234);
        assert_eq!(writer.buffer(), &[0x34, 0x12]);
    }

    #[test]
    fn test_string_roundtrip() {
        let mut writer = ArtifactWriter::new();
        writer.emit_string("run");
        writer.emit_string("");

        let mut reader = ArtifactReader::new(writer.buffer());
        assert_eq!(reader.read_string().unwrap(), "run");
        assert_eq!(reader.read_string().unwrap(), "");
    }

    #[test]
    fn test_bounds_checking() {
        let bytes = [0x01u8, 0x02];
        let mut reader = ArtifactReader::new(&bytes);
        assert!(reader.read_u32().is_err());
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_truncated_string() {
        let mut writer = ArtifactWriter::new();
        writer.emit_u32(10); // claims 10 bytes, provides 2
        writer.emit_bytes(b"ab");

        let mut reader = ArtifactReader::new(writer.buffer());
        assert!(reader.read_string().is_err());
    }

    #[test]
    fn test_position_tracking() {
        let mut writer = ArtifactWriter::new();
        writer.emit_u8(1);
        writer.emit_u32(2);
        assert_eq!(writer.offset(), 5);

        let mut reader = ArtifactReader::new(writer.buffer());
        reader.read_u8().unwrap();
        assert_eq!(reader.position(), 1);
        reader.read_u32().unwrap();
        assert_eq!(reader.position(), 5);
    }
}
