//! Tagged-chunk container framing shared by the MDL and WMB formats.
//!
//! A chunk region is a flat sequence of records, each a four byte tag, a
//! `u32` payload length and the payload itself. Repeated tags are legal
//! siblings (one `MESH` chunk per mesh). Payloads may themselves be chunk
//! structured; whether a given tag nests is a format decision made by the
//! caller via [`Chunk::children`], not by this layer.
//!
//! Unknown tags are handed back as opaque byte spans so decoders can skip
//! them. That is what keeps a viewer working against newer asset revisions
//! that add optional chunks.

use crate::formats::{ChunkTag, DecodeError, cursor::Cursor};

/// One parsed chunk: its tag plus a view of exactly its payload bytes.
#[derive(Clone)]
pub struct Chunk<'a> {
    pub tag: ChunkTag,
    /// Absolute offset of the payload within the original buffer, for
    /// diagnostics.
    pub offset: usize,
    payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// A cursor scoped to exactly this chunk's payload. Reads through it can
    /// never escape the chunk, regardless of what the payload claims.
    pub fn cursor(&self) -> Cursor<'a> {
        Cursor::new(self.payload)
    }

    /// Re-apply chunk framing to this payload, for tags whose payload is
    /// itself a chunk sequence.
    pub fn children(&self) -> ChunkReader<'a> {
        ChunkReader::with_base(self.payload, self.offset)
    }
}

/// Sequential reader over a chunk region.
pub struct ChunkReader<'a> {
    cursor: Cursor<'a>,
    base: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    fn with_base(data: &'a [u8], base: usize) -> Self {
        Self {
            cursor: Cursor::new(data),
            base,
        }
    }

    /// Read the next chunk header and return the bounded chunk, or `None` at
    /// the end of the region.
    ///
    /// The declared payload length is validated against the remaining bytes
    /// before it is used; a length that overruns the region fails with
    /// [`DecodeError::MalformedChunk`] instead of driving an unbounded read.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk<'a>>, DecodeError> {
        if self.cursor.is_empty() {
            return Ok(None);
        }
        let header_offset = self.base + self.cursor.pos();
        let tag_bytes = self.cursor.read_bytes(4)?;
        let tag = ChunkTag([tag_bytes[0], tag_bytes[1], tag_bytes[2], tag_bytes[3]]);
        let len = self.cursor.read_u32()? as usize;
        if len > self.cursor.remaining() {
            return Err(DecodeError::MalformedChunk {
                tag,
                offset: header_offset,
                reason: format!(
                    "declared length {} exceeds the {} remaining bytes",
                    len,
                    self.cursor.remaining()
                ),
            });
        }
        let offset = self.base + self.cursor.pos();
        let payload = self.cursor.read_bytes(len)?;
        Ok(Some(Chunk {
            tag,
            offset,
            payload,
        }))
    }
}

/// Enumerate every chunk in a region, validating framing only.
///
/// Payloads are returned untouched, which lets a decoder locate and check
/// its header chunk before committing to parsing anything else.
pub fn collect(data: &[u8]) -> Result<Vec<Chunk<'_>>, DecodeError> {
    let mut reader = ChunkReader::new(data);
    let mut chunks = Vec::new();
    while let Some(chunk) = reader.next_chunk()? {
        chunks.push(chunk);
    }
    Ok(chunks)
}
