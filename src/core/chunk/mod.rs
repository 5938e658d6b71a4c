// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Save-state chunks
//!
//! A chunk is a named, length-prefixed record inside a save-state file. It
//! owns its payload and carries a read cursor, so decoders can pull typed
//! fields off it one after another:
//!
//! ```text
//! +------+-----------+---------------------+
//! | tag  | size (LE) | payload (size bytes)|
//! | 4 B  | 4 B       |                     |
//! +------+-----------+---------------------+
//! ```
//!
//! # Read Semantics
//!
//! - Multi-byte values are little-endian, accumulated byte by byte so the
//!   result does not depend on host endianness
//! - Every read advances the cursor by the exact width consumed; running past
//!   the end of the payload is a `ChunkOverrun` error
//! - A chunk without a backing buffer reads as zeros and never errors
//!
//! # Example
//!
//! ```
//! use ticodec::core::chunk::{Chunk, ChunkTag};
//!
//! let mut chunk = Chunk::new(ChunkTag::LINK, vec![0x01, 0x34, 0x12]);
//! assert_eq!(chunk.read_u8().unwrap(), 0x01);
//! assert_eq!(chunk.read_u16().unwrap(), 0x1234);
//! assert!(chunk.read_u8().is_err());
//! ```

use crate::core::error::{CodecError, Result};
use std::fmt;

/// Four-character chunk identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTag([u8; 4]);

impl ChunkTag {
    pub const CPU: ChunkTag = ChunkTag(*b"CPU ");
    pub const MEM: ChunkTag = ChunkTag(*b"MEMC");
    pub const ROM: ChunkTag = ChunkTag(*b"ROM ");
    pub const RAM: ChunkTag = ChunkTag(*b"RAM ");
    pub const TIMER: ChunkTag = ChunkTag(*b"TIME");
    pub const LCD: ChunkTag = ChunkTag(*b"LCD ");
    pub const LINK: ChunkTag = ChunkTag(*b"LINK");
    pub const STDINT: ChunkTag = ChunkTag(*b"STDI");
    pub const SE_AUX: ChunkTag = ChunkTag(*b"SEAX");
    pub const USB: ChunkTag = ChunkTag(*b"USB ");
    pub const REMAP: ChunkTag = ChunkTag(*b"RMAP");
    pub const RAM_LIMIT: ChunkTag = ChunkTag(*b"RMLM");
    pub const FLASH_BREAKS: ChunkTag = ChunkTag(*b"FBRK");
    pub const NUM_FLASH_BREAKS: ChunkTag = ChunkTag(*b"NFBK");
    pub const RAM_BREAKS: ChunkTag = ChunkTag(*b"RBRK");
    pub const NUM_RAM_BREAKS: ChunkTag = ChunkTag(*b"NRBK");

    /// Create a tag from raw bytes
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Raw tag bytes as stored on disk
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// A named binary record with a bounds-checked read cursor
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    tag: ChunkTag,
    cursor: usize,
    size: usize,
    data: Option<Vec<u8>>,
}

impl Chunk {
    /// Create a chunk owning `data`
    pub fn new(tag: ChunkTag, data: Vec<u8>) -> Self {
        Self {
            tag,
            cursor: 0,
            size: data.len(),
            data: Some(data),
        }
    }

    /// Create a chunk with no backing buffer
    ///
    /// Every read on an empty chunk returns zero (or a zero-filled block).
    pub fn empty(tag: ChunkTag) -> Self {
        Self {
            tag,
            cursor: 0,
            size: 0,
            data: None,
        }
    }

    pub fn tag(&self) -> ChunkTag {
        self.tag
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Payload bytes, if the chunk has been loaded
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Bytes left between the cursor and the end of the payload
    pub fn remaining(&self) -> usize {
        self.size - self.cursor
    }

    /// Move the cursor back to the start of the payload
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Drop the payload buffer, keeping the tag
    pub fn release(&mut self) {
        self.data = None;
        self.cursor = 0;
        self.size = 0;
    }

    /// Consume `width` bytes, returning them if the chunk has data
    fn advance(&mut self, width: usize) -> Result<Option<&[u8]>> {
        if self.data.is_none() {
            return Ok(None);
        }

        let start = self.cursor;
        let end = start.saturating_add(width);
        if end > self.size {
            return Err(CodecError::ChunkOverrun {
                tag: self.tag.to_string(),
                cursor: end,
                size: self.size,
            });
        }
        self.cursor = end;

        Ok(self.data.as_deref().map(|data| &data[start..end]))
    }

    /// Read `width` bytes as a little-endian unsigned value
    fn read_le(&mut self, width: usize) -> Result<u64> {
        let value = self.advance(width)?.map_or(0, |bytes| {
            bytes
                .iter()
                .rev()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
        });
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_le(1)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_le(2)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_le(4)? as u32)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_le(8)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_le(8)?))
    }

    /// Read a 32-bit flag; any non-zero value is true
    pub fn read_bool32(&mut self) -> Result<bool> {
        Ok(self.read_u32()? != 0)
    }

    /// Read `len` raw bytes
    ///
    /// On a chunk with no backing buffer this returns `len` zero bytes.
    pub fn read_block(&mut self, len: usize) -> Result<Vec<u8>> {
        match self.advance(len)? {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Ok(vec![0; len]),
        }
    }
}

/// Little-endian encoder producing chunk payloads
///
/// Writes mirror the `Chunk` read methods one to one, so a decoder and its
/// encoder can be read side by side.
#[derive(Debug, Default)]
pub struct ChunkWriter {
    buf: Vec<u8>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_bits().to_le_bytes());
        self
    }

    pub fn write_bool32(&mut self, value: bool) -> &mut Self {
        self.write_u32(u32::from(value))
    }

    pub fn write_block(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Wrap the written bytes into a chunk
    pub fn finish(self, tag: ChunkTag) -> Chunk {
        Chunk::new(tag, self.buf)
    }
}
