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

//! Save state file format
//!
//! A save state is a 128-byte header followed by a table of chunks:
//!
//! ```text
//! offset  size  field
//! 0       8     magic "*WABBIT*"
//! 8       4     chunk table offset (relative to byte 12)
//! 12      4     version major
//! 16      4     version minor
//! 20      4     version build
//! 24      4     model id
//! 28      4     chunk count
//! 32      32    author (null padded)
//! 64      64    comment (null padded)
//! 128     ...   chunk table
//! ```
//!
//! Loading happens in two phases. [`SaveState::read`] builds the chunk catalog
//! from raw bytes, then [`SaveState::load_slot`] decodes every hardware block
//! into a [`MachineState`] and applies it to a [`Calculator`] only once the
//! whole decode has succeeded.

mod decode;
mod encode;
mod hardware;

pub use decode::{
    decode_color_lcd, decode_cpu, decode_lcd, decode_link, decode_link_assist, decode_memory,
    decode_se_aux, decode_stdint, decode_timer, decode_usb, seax_is_link_assist_only, Gate,
    GatedField, CPU_MODEL_BITS, CPU_MODEL_BITS_BUILD, LCD_CONTRAST, LCD_SCREEN_ADDR,
    LCD_SCREEN_ADDR_BUILD, MEM_CMD_BYTE, MEM_C_CMD_BUILD, NEW_CONTRAST_MODEL_BUILD,
};
pub use encode::{
    encode_cpu, encode_lcd, encode_link, encode_link_assist, encode_memory, encode_se_aux,
    encode_stdint, encode_timer,
};
pub use hardware::*;

use crate::core::chunk::{Chunk, ChunkTag};
use crate::core::error::{CodecError, Result};
use crate::core::io::{padded_text, ReadLeExt, WriteLeExt};
use crate::core::model::CalcModel;
use std::io::{Cursor, Write};
use std::path::Path;

/// Plain save state magic
pub const DETECT_STR: &[u8; 8] = b"*WABBIT*";

/// Compressed save state magic (recognized, never decoded)
pub const DETECT_CMP_STR: &[u8; 8] = b"*WABCMP*";

pub const CUR_MAJOR: u32 = 0;
pub const CUR_MINOR: u32 = 1;
pub const CUR_BUILD: u32 = 3;

pub const MAX_AUTHOR_LENGTH: usize = 32;
pub const MAX_COMMENT_LENGTH: usize = 64;

/// Size of the fixed header preceding the chunk table
pub const SAVE_HEADER_SIZE: usize = 128;

/// The stored table offset counts from the end of the offset field
const TABLE_OFFSET_BASE: usize = 12;

/// Version and model fields every decoder may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveHeader {
    pub version_major: u32,
    pub version_minor: u32,
    pub version_build: u32,
    pub model: CalcModel,
}

impl SaveHeader {
    /// Header for a save written by this crate
    pub fn current(model: CalcModel) -> Self {
        Self {
            version_major: CUR_MAJOR,
            version_minor: CUR_MINOR,
            version_build: CUR_BUILD,
            model,
        }
    }
}

/// Tag-indexed chunk collection, in table order
#[derive(Debug, Clone, Default)]
pub struct ChunkCatalog {
    chunks: Vec<Chunk>,
}

impl ChunkCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `count` table entries from `table`
    ///
    /// A short entry fails the whole parse; no partial catalog is returned.
    pub fn parse_table(table: &[u8], count: u32) -> Result<Self> {
        let mut catalog = Self::new();
        let mut pos = 0usize;

        for index in 0..count {
            if table.len() - pos < 8 {
                return Err(CodecError::TruncatedInput(format!(
                    "chunk table entry {} of {} has no room for tag and size",
                    index, count
                )));
            }
            let tag = ChunkTag::new([table[pos], table[pos + 1], table[pos + 2], table[pos + 3]]);
            let size = u32::from_le_bytes([
                table[pos + 4],
                table[pos + 5],
                table[pos + 6],
                table[pos + 7],
            ]) as usize;
            pos += 8;

            if table.len() - pos < size {
                return Err(CodecError::TruncatedInput(format!(
                    "chunk '{}' declares {} bytes, only {} remain",
                    tag,
                    size,
                    table.len() - pos
                )));
            }
            let payload = table[pos..pos + size].to_vec();
            pos += size;

            catalog.insert(Chunk::new(tag, payload));
        }

        Ok(catalog)
    }

    /// Add a chunk; a duplicate tag is logged and dropped
    pub fn insert(&mut self, chunk: Chunk) -> bool {
        if self.get(chunk.tag()).is_some() {
            log::warn!("Duplicate chunk '{}' skipped", chunk.tag());
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub fn get(&self, tag: ChunkTag) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.tag() == tag)
    }

    /// Look up a chunk and rewind it for decoding
    pub fn find(&mut self, tag: ChunkTag) -> Option<&mut Chunk> {
        let chunk = self.chunks.iter_mut().find(|c| c.tag() == tag)?;
        chunk.rewind();
        Some(chunk)
    }

    /// Like [`find`](Self::find), failing with `MissingChunk` when absent
    pub fn require(&mut self, tag: ChunkTag) -> Result<&mut Chunk> {
        self.find(tag)
            .ok_or_else(|| CodecError::MissingChunk(tag.to_string()))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn tags(&self) -> Vec<ChunkTag> {
        self.chunks.iter().map(Chunk::tag).collect()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// A parsed save state: header fields plus the chunk catalog
#[derive(Debug, Clone)]
pub struct SaveState {
    header: SaveHeader,
    author: String,
    comment: String,
    chunks: ChunkCatalog,
}

impl SaveState {
    /// Create an empty save state at the current format version
    pub fn new(model: CalcModel, author: &str, comment: &str) -> Self {
        Self {
            header: SaveHeader::current(model),
            author: author.to_string(),
            comment: comment.to_string(),
            chunks: ChunkCatalog::new(),
        }
    }

    /// Whether `bytes` start with either save state magic (case-insensitive)
    pub fn sniff(bytes: &[u8]) -> bool {
        bytes.len() >= 8
            && (bytes[..8].eq_ignore_ascii_case(DETECT_STR)
                || bytes[..8].eq_ignore_ascii_case(DETECT_CMP_STR))
    }

    /// Parse a complete save state file image
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let magic: [u8; 8] = cursor.read_array("save state magic")?;

        if magic.eq_ignore_ascii_case(DETECT_CMP_STR) {
            return Err(CodecError::UnsupportedFormat(
                "compressed save states are not supported".to_string(),
            ));
        }
        if &magic != DETECT_STR {
            return Err(CodecError::FormatUnrecognized(
                "missing save state magic".to_string(),
            ));
        }

        let table_offset = cursor.read_u32_le("chunk table offset")? as usize;
        let version_major = cursor.read_u32_le("version major")?;
        let version_minor = cursor.read_u32_le("version minor")?;
        let version_build = cursor.read_u32_le("version build")?;

        if version_major != CUR_MAJOR {
            return Err(CodecError::IncompatibleVersion {
                expected: CUR_MAJOR,
                found: version_major,
            });
        }

        let model_id = cursor.read_u32_le("model id")?;
        let model = CalcModel::from_id(model_id).ok_or_else(|| {
            CodecError::FormatUnrecognized(format!("unknown model id {}", model_id))
        })?;
        let chunk_count = cursor.read_u32_le("chunk count")?;

        let author = padded_text(&cursor.read_array::<MAX_AUTHOR_LENGTH>("author")?);
        let comment = padded_text(&cursor.read_array::<MAX_COMMENT_LENGTH>("comment")?);

        let table_start = table_offset.saturating_add(TABLE_OFFSET_BASE);
        if table_start > bytes.len() {
            return Err(CodecError::TruncatedInput(format!(
                "chunk table offset {} beyond end of file ({} bytes)",
                table_start,
                bytes.len()
            )));
        }
        let chunks = ChunkCatalog::parse_table(&bytes[table_start..], chunk_count)?;

        log::info!(
            "Loaded save state: {} v{}.{}.{}, {} chunks",
            model,
            version_major,
            version_minor,
            version_build,
            chunks.len()
        );

        Ok(Self {
            header: SaveHeader {
                version_major,
                version_minor,
                version_build,
                model,
            },
            author,
            comment,
            chunks,
        })
    }

    /// Load and parse a save state from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::read(&bytes)
    }

    /// Serialize header and chunk table
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(SAVE_HEADER_SIZE);
        out.write_all(DETECT_STR)?;
        out.write_u32_le((SAVE_HEADER_SIZE - TABLE_OFFSET_BASE) as u32)?;
        out.write_u32_le(self.header.version_major)?;
        out.write_u32_le(self.header.version_minor)?;
        out.write_u32_le(self.header.version_build)?;
        out.write_u32_le(self.header.model.id())?;
        out.write_u32_le(self.chunks.len() as u32)?;
        out.write_padded(self.author.as_bytes(), MAX_AUTHOR_LENGTH)?;
        out.write_padded(self.comment.as_bytes(), MAX_COMMENT_LENGTH)?;

        for chunk in self.chunks.iter() {
            let data = chunk.data().unwrap_or(&[]);
            out.write_all(chunk.tag().as_bytes())?;
            out.write_u32_le(data.len() as u32)?;
            out.write_all(data)?;
        }

        Ok(out)
    }

    /// Write the save state to disk
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        log::info!("Save state written to {}", path.as_ref().display());
        Ok(())
    }

    pub fn header(&self) -> &SaveHeader {
        &self.header
    }

    pub fn model(&self) -> CalcModel {
        self.header.model
    }

    pub fn version(&self) -> (u32, u32, u32) {
        (
            self.header.version_major,
            self.header.version_minor,
            self.header.version_build,
        )
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn chunks(&self) -> &ChunkCatalog {
        &self.chunks
    }

    /// Add a chunk to the catalog (duplicates are dropped)
    pub fn insert_chunk(&mut self, chunk: Chunk) -> bool {
        self.chunks.insert(chunk)
    }

    /// Raw flash image stored in the `ROM ` chunk
    pub fn rom_only(&self) -> Option<&[u8]> {
        self.chunks.get(ChunkTag::ROM).and_then(Chunk::data)
    }

    /// Release every chunk payload
    pub fn free_save(&mut self) {
        self.chunks.clear();
    }

    /// Decode the catalog against a hardware profile without applying it
    pub fn decode(&mut self, profile: HardwareProfile) -> Result<MachineState> {
        let header = self.header;
        MachineState::decode(&mut self.chunks, &header, profile)
    }

    /// Decode everything, then apply it to `calc`
    ///
    /// On error the calculator is left untouched.
    pub fn load_slot(&mut self, calc: &mut dyn Calculator) -> Result<()> {
        let profile = calc.profile();
        let state = self.decode(profile)?;
        state.apply(calc);
        log::info!("Save state applied to {}", profile.model);
        Ok(())
    }

    /// Snapshot a calculator into a new save state
    pub fn capture(calc: &mut dyn Calculator, author: &str, comment: &str) -> Self {
        let model = calc.model();
        let state = MachineState::capture(calc);

        let mut save = Self::new(model, author, comment);
        for chunk in state.encode(model) {
            save.insert_chunk(chunk);
        }
        save
    }
}

#[cfg(test)]
mod tests;
