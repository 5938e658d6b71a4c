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

//! Intel HEX records
//!
//! Flash OS and application files carry their payload as Intel HEX text:
//!
//! ```text
//! :SSAAAATT<data>CC
//!  |  |   | |     +- checksum
//!  |  |   | +------- SS data bytes as hex pairs
//!  |  |   +--------- record type (00 data, 01 end, 02 segment)
//!  |  +------------- 16-bit address
//!  +---------------- data byte count
//! ```
//!
//! The reader parses the checksum but does not verify it; files in the wild
//! are accepted as-is. The writer always emits correct checksums.

use crate::core::error::{CodecError, Result};
use std::io::{BufRead, Write};

/// Longest line the reader accepts
pub const MAX_LINE_LENGTH: usize = 580;

/// Record types
pub const RECORD_DATA: u8 = 0x00;
pub const RECORD_EOF: u8 = 0x01;
pub const RECORD_EXT_SEGMENT: u8 = 0x02;

/// Data bytes per record emitted by the writer
pub const DEFAULT_RECORD_LENGTH: usize = 0x20;

/// One parsed Intel HEX line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntelHexRecord {
    pub data_size: u8,
    pub address: u16,
    pub record_type: u8,
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl IntelHexRecord {
    /// Build a record, filling in size and checksum
    pub fn new(record_type: u8, address: u16, data: Vec<u8>) -> Self {
        let mut record = Self {
            data_size: data.len() as u8,
            address,
            record_type,
            data,
            checksum: 0,
        };
        record.checksum = record.computed_checksum();
        record
    }

    pub fn data_record(address: u16, data: &[u8]) -> Self {
        Self::new(RECORD_DATA, address, data.to_vec())
    }

    /// Segment record selecting `page` (stored big-endian)
    pub fn ext_segment(page: u16) -> Self {
        Self::new(RECORD_EXT_SEGMENT, 0, page.to_be_bytes().to_vec())
    }

    pub fn eof() -> Self {
        Self::new(RECORD_EOF, 0, Vec::new())
    }

    /// Two's complement of the byte sum of every field before the checksum
    pub fn computed_checksum(&self) -> u8 {
        let mut sum = self.data_size;
        sum = sum.wrapping_add((self.address >> 8) as u8);
        sum = sum.wrapping_add((self.address & 0xFF) as u8);
        sum = sum.wrapping_add(self.record_type);
        for &b in &self.data {
            sum = sum.wrapping_add(b);
        }
        (!sum).wrapping_add(1)
    }

    /// Data byte at `index`, or 0 when the record is shorter
    pub fn byte(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }

    /// Parse one line (without its terminator)
    pub fn parse(line: &[u8], line_no: usize) -> Result<Self> {
        let fail = |reason: &str| CodecError::HexParse {
            line: line_no,
            reason: reason.to_string(),
        };

        if line.len() > MAX_LINE_LENGTH {
            return Err(fail("line too long"));
        }

        let line = line.strip_prefix(&[0u8]).unwrap_or(line);
        let body = line
            .strip_prefix(b":")
            .ok_or_else(|| fail("missing ':' record mark"))?;

        let hex_byte = |pos: usize| -> Result<u8> {
            let pair = body
                .get(pos..pos + 2)
                .ok_or_else(|| fail("short record"))?;
            let nibble = |c: u8| {
                char::from(c)
                    .to_digit(16)
                    .ok_or_else(|| fail("non-hex character"))
            };
            Ok((nibble(pair[0])? << 4 | nibble(pair[1])?) as u8)
        };

        let data_size = hex_byte(0)?;
        let address = u16::from_be_bytes([hex_byte(2)?, hex_byte(4)?]);
        let record_type = hex_byte(6)?;

        let mut data = Vec::with_capacity(data_size as usize);
        for i in 0..data_size as usize {
            data.push(hex_byte(8 + i * 2)?);
        }
        let checksum = hex_byte(8 + data_size as usize * 2)?;

        Ok(Self {
            data_size,
            address,
            record_type,
            data,
            checksum,
        })
    }

    /// Render as a `:`-prefixed line without terminator
    pub fn to_line(&self) -> String {
        let mut line = format!(
            ":{:02X}{:04X}{:02X}",
            self.data_size, self.address, self.record_type
        );
        for b in &self.data {
            line.push_str(&format!("{:02X}", b));
        }
        line.push_str(&format!("{:02X}", self.checksum));
        line
    }
}

/// Line-oriented record reader
pub struct IntelHexReader<R> {
    inner: R,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> IntelHexReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: Vec::with_capacity(MAX_LINE_LENGTH),
        }
    }

    /// Number of lines consumed so far
    pub fn line(&self) -> usize {
        self.line
    }

    /// Read the next record; running out of input is `TruncatedInput`
    pub fn next_record(&mut self) -> Result<IntelHexRecord> {
        self.buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Err(CodecError::TruncatedInput(format!(
                "end of input after {} hex records",
                self.line
            )));
        }
        self.line += 1;

        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }

        IntelHexRecord::parse(&self.buf, self.line)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Record writer with computed checksums
pub struct IntelHexWriter<W> {
    out: W,
    record_length: usize,
}

impl<W: Write> IntelHexWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            record_length: DEFAULT_RECORD_LENGTH,
        }
    }

    /// Change how many data bytes go into each record (1..=255)
    pub fn with_record_length(mut self, len: usize) -> Self {
        self.record_length = len.clamp(1, 0xFF);
        self
    }

    pub fn write_record(&mut self, record: &IntelHexRecord) -> Result<()> {
        write!(self.out, "{}\r\n", record.to_line())?;
        Ok(())
    }

    /// Write `data` as consecutive data records starting at `address`
    pub fn write_data(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let mut addr = address;
        for piece in data.chunks(self.record_length) {
            self.write_record(&IntelHexRecord::data_record(addr, piece))?;
            addr = addr.wrapping_add(piece.len() as u16);
        }
        Ok(())
    }

    pub fn write_ext_segment(&mut self, page: u16) -> Result<()> {
        self.write_record(&IntelHexRecord::ext_segment(page))
    }

    pub fn write_eof(&mut self) -> Result<()> {
        self.write_record(&IntelHexRecord::eof())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
