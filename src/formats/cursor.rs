//! Bounds-checked little-endian reading over a fixed byte buffer.
//!
//! Every decode in this crate goes through [`Cursor`]. All multi-byte reads
//! are little-endian, matching the asset pipeline's native layout; there is
//! no per-field endianness. A cursor is cheap to clone, which is how callers
//! do lookahead without committing their position.

use crate::formats::DecodeError;

/// A read position over a borrowed byte buffer.
///
/// Reads fail with [`DecodeError::TruncatedData`] when the requested span
/// runs past the end of the buffer; `seek` past the end fails with
/// [`DecodeError::OutOfRange`]. The cursor never reads outside its buffer.
#[derive(Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current absolute offset into the buffer.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left between the current position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow `n` raw bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::TruncatedData {
                offset: self.pos,
                wanted: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_vec2(&mut self) -> Result<[f32; 2], DecodeError> {
        Ok([self.read_f32()?, self.read_f32()?])
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3], DecodeError> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    /// Read a fixed-size field holding a zero-padded string.
    ///
    /// The asset formats store names and paths in fixed `char[n]` fields with
    /// trailing zero padding. Everything after the first NUL is discarded;
    /// non-UTF-8 bytes are replaced rather than failing the decode.
    pub fn read_fixed_str(&mut self, n: usize) -> Result<String, DecodeError> {
        let bytes = self.read_bytes(n)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(n);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Move to an absolute offset. The end of the buffer is a valid target.
    pub fn seek(&mut self, offset: usize) -> Result<(), DecodeError> {
        if offset > self.data.len() {
            return Err(DecodeError::OutOfRange {
                offset,
                len: self.data.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    /// Advance past `n` bytes without reading them.
    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::TruncatedData {
                offset: self.pos,
                wanted: n,
                available: self.remaining(),
            });
        }
        self.pos += n;
        Ok(())
    }
}
