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

//! Variable and group files
//!
//! After the 53-byte file header comes a 16-bit section length and one or
//! more entries:
//!
//! ```text
//! u16 header size
//! u16 length
//! u8  type
//! u8  name length        (TI-85/86 only)
//! 8B  name               (TI-85: name length bytes)
//! u8  version, u8 flag   (TI-83 Plus only)
//! u16 length copy
//! ..  data (length bytes)
//! ```
//!
//! The section ends with a 16-bit checksum.

use super::backup::{import_backup, TiBackup};
use crate::core::error::{CodecError, Result};
use crate::core::io::ReadLeExt;
use crate::core::model::CalcModel;
use bitflags::bitflags;
use serde::Serialize;
use std::io::Read;

/// Bytes of bookkeeping assumed per group entry
pub const GROUP_ENTRY_OVERHEAD: i32 = 17;

/// Most entries a group file may carry
pub const MAX_GROUP_VARS: usize = 256;

/// Length of the name field
pub const VAR_NAME_LENGTH: usize = 8;

bitflags! {
    /// TI-83 Plus variable flag byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct VarFlags: u8 {
        /// Variable lives in flash archive
        const ARCHIVED = 0x80;
    }
}

/// One variable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiVar {
    pub header_size: u16,
    pub length: u16,
    /// Duplicate of `length` stored after the name
    pub length2: u16,
    pub var_type: u8,
    pub name_length: u8,
    pub name: [u8; VAR_NAME_LENGTH],
    pub version: u8,
    pub flag: VarFlags,
    pub data: Vec<u8>,
}

impl TiVar {
    /// Build a variable from its name and payload
    pub fn new(var_type: u8, name: &str, data: Vec<u8>) -> Self {
        let mut name_bytes = [0u8; VAR_NAME_LENGTH];
        let take = name.len().min(VAR_NAME_LENGTH);
        name_bytes[..take].copy_from_slice(&name.as_bytes()[..take]);

        let length = data.len() as u16;
        Self {
            header_size: 0,
            length,
            length2: length,
            var_type,
            name_length: take as u8,
            name: name_bytes,
            version: 0,
            flag: VarFlags::empty(),
            data,
        }
    }

    /// Name with trailing NULs removed
    pub fn name_str(&self) -> String {
        crate::core::io::padded_text(&self.name)
    }

    pub fn is_archived(&self) -> bool {
        self.flag.contains(VarFlags::ARCHIVED)
    }
}

/// Remaining-length bookkeeping for group files
///
/// Starts at the section length and loses `length + 17` per entry; the group
/// ends once it drops to zero or below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupAccumulator {
    remaining: i32,
    count: usize,
}

impl GroupAccumulator {
    pub fn new(section_length: u16) -> Self {
        Self {
            remaining: i32::from(section_length),
            count: 0,
        }
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether an entry of `length` bytes leaves more data behind it
    pub fn has_more_than(&self, length: u16) -> bool {
        self.remaining > i32::from(length) + GROUP_ENTRY_OVERHEAD
    }

    /// Account for one entry; true while more entries follow
    pub fn consume(&mut self, length: u16) -> bool {
        self.count += 1;
        self.remaining -= i32::from(length) + GROUP_ENTRY_OVERHEAD;
        self.remaining > 0
    }
}

/// What the var section turned out to hold
#[derive(Debug)]
pub enum VarSection {
    Vars {
        vars: Vec<TiVar>,
        group: bool,
        checksum: Option<u16>,
    },
    Backup(TiBackup),
}

/// Model/type pairs whose payload is a memory backup
pub fn is_backup_type(model: CalcModel, var_type: u8) -> bool {
    matches!(
        (model, var_type),
        (CalcModel::Ti73, 0x13) | (CalcModel::Ti82, 0x0F) | (CalcModel::Ti85, 0x1D)
    )
}

fn read_var_body<R: Read>(
    r: &mut R,
    model: CalcModel,
    header_size: u16,
    length: u16,
    var_type: u8,
    warnings: &mut Vec<CodecError>,
) -> Result<TiVar> {
    let mut name_length = VAR_NAME_LENGTH as u8;
    if matches!(model, CalcModel::Ti85 | CalcModel::Ti86) {
        name_length = r.read_u8("name length")?;
    }

    // TI-86 pads every name to eight bytes regardless of the stored length
    let stored = if model == CalcModel::Ti86 {
        VAR_NAME_LENGTH
    } else {
        usize::from(name_length)
    };
    let raw_name = r.read_bytes(stored, "variable name")?;
    let mut name = [0u8; VAR_NAME_LENGTH];
    let take = raw_name.len().min(VAR_NAME_LENGTH);
    name[..take].copy_from_slice(&raw_name[..take]);

    let (version, flag) = if model == CalcModel::Ti83P {
        let version = r.read_u8("variable version")?;
        let flag = VarFlags::from_bits_retain(r.read_u8("variable flag")?);
        (version, flag)
    } else {
        (0, VarFlags::empty())
    };

    let length2 = r.read_u16_le("variable length copy")?;
    if length2 != length {
        let warning = CodecError::LengthMismatch {
            what: "variable",
            primary: length,
            copy: length2,
        };
        log::warn!("{}", warning);
        warnings.push(warning);
    }

    let data = r.read_bytes(usize::from(length), "variable data")?;

    Ok(TiVar {
        header_size,
        length,
        length2,
        var_type,
        name_length,
        name,
        version,
        flag,
        data,
    })
}

/// Read the var section following a 53-byte var file header
pub fn import_var_section<R: Read>(
    r: &mut R,
    model: CalcModel,
    warnings: &mut Vec<CodecError>,
) -> Result<VarSection> {
    let section_length = r.read_u16_le("var section length")?;
    let mut acc = GroupAccumulator::new(section_length);
    let mut vars = Vec::new();
    let mut group = false;

    loop {
        if vars.len() >= MAX_GROUP_VARS {
            return Err(CodecError::TooManyVariables {
                limit: MAX_GROUP_VARS,
            });
        }

        let header_size = r.read_u16_le("variable header size")?;
        let length = r.read_u16_le("variable length")?;
        let var_type = r.read_u8("variable type")?;

        if vars.is_empty() && is_backup_type(model, var_type) {
            log::info!("Var file holds a {} memory backup", model);
            let backup = import_backup(r, header_size, length, var_type, warnings)?;
            return Ok(VarSection::Backup(backup));
        }

        if group || acc.has_more_than(length) {
            group = true;
        }

        let var = read_var_body(r, model, header_size, length, var_type, warnings)?;
        log::debug!("Read variable '{}' ({} bytes)", var.name_str(), var.length);
        vars.push(var);

        if !group || !acc.consume(length) {
            break;
        }
    }

    let mut checksum_bytes = [0u8; 2];
    let checksum = match r.read_fill(&mut checksum_bytes, "checksum") {
        Ok(()) => Some(u16::from_le_bytes(checksum_bytes)),
        Err(CodecError::TruncatedInput(_)) => {
            log::debug!("Var file ends without a checksum");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(VarSection::Vars {
        vars,
        group,
        checksum,
    })
}
