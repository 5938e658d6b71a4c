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

//! Flash OS and application files
//!
//! A 78-byte header followed by Intel HEX text. Extended-segment records
//! select the 16 KiB page the following data records land in.
//!
//! ```text
//! 0x00  signature "**TIFL**"
//! 0x08  revision major, minor
//! 0x0A  flag
//! 0x0B  object type
//! 0x0C  date (BCD day, month, century, year)
//! 0x10  name length
//! 0x11  name (8 bytes)
//! 0x30  device
//! 0x31  data type
//! 0x4A  hex text size (u32 LE)
//! ```

use crate::core::error::{CodecError, Result};
use crate::core::intel_hex::{
    IntelHexReader, IntelHexWriter, RECORD_DATA, RECORD_EOF, RECORD_EXT_SEGMENT,
};
use crate::core::io::padded_text;
use crate::core::model::CalcModel;
use chrono::{Datelike, NaiveDate};
use std::io::{BufRead, Write};

pub const TI_FLASH_HEADER_SIZE: usize = 78;
pub const FLASH_SIGNATURE: &[u8; 8] = b"**TIFL**";

pub const FLASH_TYPE_OS: u8 = 0x23;
pub const FLASH_TYPE_APP: u8 = 0x24;

pub const DEVICE_TI73: u8 = 0x74;
pub const DEVICE_TI83P: u8 = 0x73;

/// Pages addressable by one extended-segment record
pub const FLASH_PAGE_COUNT: usize = 256;
pub const FLASH_PAGE_SIZE: usize = 0x4000;

/// Bank address data records are written against
const PAGE_BASE_ADDRESS: u16 = 0x4000;

const NAME_OFFSET: usize = 17;
const NAME_LENGTH: usize = 8;
const DEVICE_OFFSET: usize = 48;
const HEX_SIZE_OFFSET: usize = 74;

/// Parsed 78-byte flash header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashHeader {
    pub revision_major: u8,
    pub revision_minor: u8,
    pub flag: u8,
    pub object: u8,
    /// Raw BCD date bytes
    pub date_bcd: [u8; 4],
    pub name_length: u8,
    pub name: [u8; NAME_LENGTH],
    pub device: u8,
    pub data_type: u8,
    pub hex_size: u32,
}

fn bcd(byte: u8) -> Option<u32> {
    let hi = byte >> 4;
    let lo = byte & 0x0F;
    if hi > 9 || lo > 9 {
        return None;
    }
    Some(u32::from(hi) * 10 + u32::from(lo))
}

fn to_bcd(value: u32) -> u8 {
    (((value / 10) % 10) << 4 | (value % 10)) as u8
}

impl FlashHeader {
    /// Header for a new image; revision and date start cleared
    pub fn new(name: &str, device: u8, data_type: u8) -> Self {
        let mut name_bytes = [0u8; NAME_LENGTH];
        let take = name.len().min(NAME_LENGTH);
        name_bytes[..take].copy_from_slice(&name.as_bytes()[..take]);

        Self {
            revision_major: 0,
            revision_minor: 0,
            flag: 0,
            object: 0,
            date_bcd: [0; 4],
            name_length: take as u8,
            name: name_bytes,
            device,
            data_type,
            hex_size: 0,
        }
    }

    pub fn parse(raw: &[u8; TI_FLASH_HEADER_SIZE]) -> Self {
        let mut name = [0u8; NAME_LENGTH];
        name.copy_from_slice(&raw[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH]);
        let mut date_bcd = [0u8; 4];
        date_bcd.copy_from_slice(&raw[12..16]);
        let mut hex_size = [0u8; 4];
        hex_size.copy_from_slice(&raw[HEX_SIZE_OFFSET..HEX_SIZE_OFFSET + 4]);

        Self {
            revision_major: raw[8],
            revision_minor: raw[9],
            flag: raw[10],
            object: raw[11],
            date_bcd,
            name_length: raw[16],
            name,
            device: raw[DEVICE_OFFSET],
            data_type: raw[DEVICE_OFFSET + 1],
            hex_size: u32::from_le_bytes(hex_size),
        }
    }

    pub fn to_bytes(&self) -> [u8; TI_FLASH_HEADER_SIZE] {
        let mut raw = [0u8; TI_FLASH_HEADER_SIZE];
        raw[..8].copy_from_slice(FLASH_SIGNATURE);
        raw[8] = self.revision_major;
        raw[9] = self.revision_minor;
        raw[10] = self.flag;
        raw[11] = self.object;
        raw[12..16].copy_from_slice(&self.date_bcd);
        raw[16] = self.name_length;
        raw[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH].copy_from_slice(&self.name);
        raw[DEVICE_OFFSET] = self.device;
        raw[DEVICE_OFFSET + 1] = self.data_type;
        raw[HEX_SIZE_OFFSET..].copy_from_slice(&self.hex_size.to_le_bytes());
        raw
    }

    /// Build date, if the BCD bytes form a real calendar date
    pub fn date(&self) -> Option<NaiveDate> {
        let [day, month, century, year] = self.date_bcd;
        let year = bcd(century)? * 100 + bcd(year)?;
        NaiveDate::from_ymd_opt(year as i32, bcd(month)?, bcd(day)?)
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        let year = date.year().max(0) as u32;
        self.date_bcd = [
            to_bcd(date.day()),
            to_bcd(date.month()),
            to_bcd(year / 100),
            to_bcd(year % 100),
        ];
    }

    pub fn name_str(&self) -> String {
        padded_text(&self.name)
    }

    pub fn is_os(&self) -> bool {
        self.data_type == FLASH_TYPE_OS
    }

    /// Model implied by the device byte
    pub fn model(&self) -> Result<CalcModel> {
        match self.device {
            DEVICE_TI73 => Ok(CalcModel::Ti73),
            DEVICE_TI83P => Ok(CalcModel::Ti83P),
            other => Err(CodecError::ModelDetection(format!(
                "unknown flash device 0x{:02X}",
                other
            ))),
        }
    }
}

/// Flash image split into pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiFlash {
    header: FlashHeader,
    pages: Vec<Option<Vec<u8>>>,
    page_sizes: Vec<usize>,
    total_pages: usize,
}

impl TiFlash {
    pub fn new(header: FlashHeader) -> Self {
        Self {
            header,
            pages: vec![None; FLASH_PAGE_COUNT],
            page_sizes: vec![0; FLASH_PAGE_COUNT],
            total_pages: 0,
        }
    }

    pub fn header(&self) -> &FlashHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut FlashHeader {
        &mut self.header
    }

    pub fn page(&self, index: usize) -> Option<&[u8]> {
        self.pages.get(index)?.as_deref()
    }

    /// Bytes used on a page
    pub fn page_size(&self, index: usize) -> usize {
        self.page_sizes.get(index).copied().unwrap_or(0)
    }

    /// Distinct pages holding data, the first OS page included
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Allocated pages in index order with their used size
    pub fn pages(&self) -> impl Iterator<Item = (usize, &[u8], usize)> {
        self.pages
            .iter()
            .enumerate()
            .filter_map(move |(i, p)| p.as_deref().map(|data| (i, data, self.page_sizes[i])))
    }

    /// Store `data` as page `index`, replacing any earlier contents
    pub fn set_page(&mut self, index: u8, data: &[u8]) {
        let index = usize::from(index);
        let mut page = vec![0u8; FLASH_PAGE_SIZE];
        let take = data.len().min(FLASH_PAGE_SIZE);
        page[..take].copy_from_slice(&data[..take]);

        if self.pages[index].is_none() {
            self.total_pages += 1;
        }
        self.pages[index] = Some(page);
        self.page_sizes[index] = take;
    }

    /// Read the Intel HEX body that follows the header
    pub fn import_hex<R: BufRead>(&mut self, reader: &mut IntelHexReader<R>) -> Result<()> {
        let mut current: Option<usize> = None;
        if self.header.is_os() {
            // OS images carry a preamble before the first page record
            loop {
                let record = reader.next_record()?;
                if record.record_type == RECORD_EXT_SEGMENT && record.data_size == 2 {
                    current = Some(self.select_page(&record.data));
                    break;
                }
            }
        }

        let mut highest: usize = 0;

        loop {
            let record = reader.next_record()?;
            match record.record_type {
                RECORD_DATA => {
                    let Some(page) = current.and_then(|i| self.pages[i].as_mut()) else {
                        continue;
                    };
                    for (i, &byte) in record.data.iter().enumerate() {
                        let addr = usize::from(record.address) + i;
                        page[addr & (FLASH_PAGE_SIZE - 1)] = byte;
                    }
                    highest = highest.max(usize::from(record.address) + record.data.len());
                }
                RECORD_EOF => {
                    let Some(index) = current else {
                        return Err(CodecError::FormatUnrecognized(format!(
                            "flash data ends at line {} before any page",
                            reader.line()
                        )));
                    };
                    self.page_sizes[index] = highest.saturating_sub(FLASH_PAGE_SIZE);
                    break;
                }
                RECORD_EXT_SEGMENT => {
                    if let Some(index) = current {
                        self.page_sizes[index] = highest.saturating_sub(FLASH_PAGE_SIZE);
                    }
                    current = Some(self.select_page(&record.data));
                    highest = 0;
                }
                other => {
                    return Err(CodecError::HexParse {
                        line: reader.line(),
                        reason: format!("unexpected record type {:02X}", other),
                    });
                }
            }
        }

        log::debug!(
            "Flash '{}' holds {} pages",
            self.header.name_str(),
            self.total_pages
        );
        Ok(())
    }

    fn select_page(&mut self, data: &[u8]) -> usize {
        let hi = data.first().copied().unwrap_or(0);
        let lo = data.get(1).copied().unwrap_or(0);
        let index = usize::from((u16::from(hi) << 8 | u16::from(lo)) & 0xFF);

        if self.pages[index].is_none() {
            self.pages[index] = Some(vec![0u8; FLASH_PAGE_SIZE]);
            self.total_pages += 1;
        }
        index
    }

    /// Write the header followed by the pages as Intel HEX
    pub fn export<W: Write>(&self, mut out: W) -> Result<()> {
        let mut writer = IntelHexWriter::new(Vec::new());
        for (index, data, size) in self.pages() {
            writer.write_ext_segment(index as u16)?;
            if size > 0 {
                writer.write_data(PAGE_BASE_ADDRESS, &data[..size])?;
            }
        }
        writer.write_eof()?;
        let body = writer.into_inner();

        let mut header = self.header.clone();
        header.hex_size = body.len() as u32;

        out.write_all(&header.to_bytes())?;
        out.write_all(&body)?;
        Ok(())
    }
}
