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

//! Little-endian stream helpers
//!
//! Used by the file headers and the var/backup importers, which read straight
//! off a byte stream rather than through a chunk. Running out of input maps to
//! `TruncatedInput` instead of a raw I/O error.

use crate::core::error::{CodecError, Result};
use std::io::{ErrorKind, Read, Write};

pub trait ReadLeExt: Read {
    /// Fill `buf` completely or fail with `TruncatedInput`
    fn read_fill(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                CodecError::TruncatedInput(format!("end of input reading {what}"))
            }
            _ => CodecError::Io(e),
        })
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_fill(&mut buf, what)?;
        Ok(buf[0])
    }

    fn read_u16_le(&mut self, what: &str) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_fill(&mut buf, what)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_fill(&mut buf, what)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_fill(&mut buf, what)?;
        Ok(buf)
    }

    fn read_bytes(&mut self, len: usize, what: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_fill(&mut buf, what)?;
        Ok(buf)
    }
}

impl<T: Read + ?Sized> ReadLeExt for T {}

pub trait WriteLeExt: Write {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])?;
        Ok(())
    }

    fn write_u16_le(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u32_le(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    /// Write `bytes` cut or null padded to exactly `len` bytes
    fn write_padded(&mut self, bytes: &[u8], len: usize) -> Result<()> {
        let take = bytes.len().min(len);
        self.write_all(&bytes[..take])?;
        self.write_all(&vec![0u8; len - take])?;
        Ok(())
    }
}

impl<T: Write + ?Sized> WriteLeExt for T {}

/// Decode a null-padded text field, dropping everything from the first NUL
pub fn padded_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
