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

//! Memory backups (TI-73, TI-82 and TI-85)

use crate::core::error::{CodecError, Result};
use crate::core::io::ReadLeExt;
use std::io::Read;

/// Three memory segments with their declared lengths
///
/// Each segment length is stored twice; a copy that disagrees with the
/// primary is reported as a warning and the primary wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiBackup {
    pub header_size: u16,
    pub var_type: u8,
    pub length1: u16,
    pub length2: u16,
    pub length3: u16,
    pub address: u16,
    pub length1_copy: u16,
    pub length2_copy: u16,
    pub length3_copy: u16,
    pub data1: Vec<u8>,
    pub data2: Vec<u8>,
    pub data3: Vec<u8>,
}

fn check_copy(what: &'static str, primary: u16, copy: u16, warnings: &mut Vec<CodecError>) {
    if primary != copy {
        let warning = CodecError::LengthMismatch {
            what,
            primary,
            copy,
        };
        log::warn!("{}", warning);
        warnings.push(warning);
    }
}

/// Read a backup body; `length1` comes from the var entry header
pub fn import_backup<R: Read>(
    r: &mut R,
    header_size: u16,
    length1: u16,
    var_type: u8,
    warnings: &mut Vec<CodecError>,
) -> Result<TiBackup> {
    let length2 = r.read_u16_le("backup length 2")?;
    let length3 = r.read_u16_le("backup length 3")?;
    let address = r.read_u16_le("backup address")?;

    let length1_copy = r.read_u16_le("backup length 1 copy")?;
    check_copy("backup segment 1", length1, length1_copy, warnings);
    let data1 = r.read_bytes(usize::from(length1), "backup segment 1")?;

    let length2_copy = r.read_u16_le("backup length 2 copy")?;
    check_copy("backup segment 2", length2, length2_copy, warnings);
    let data2 = r.read_bytes(usize::from(length2), "backup segment 2")?;

    let length3_copy = r.read_u16_le("backup length 3 copy")?;
    check_copy("backup segment 3", length3, length3_copy, warnings);
    let data3 = r.read_bytes(usize::from(length3), "backup segment 3")?;

    Ok(TiBackup {
        header_size,
        var_type,
        length1,
        length2,
        length3,
        address,
        length1_copy,
        length2_copy,
        length3_copy,
        data1,
        data2,
        data3,
    })
}
