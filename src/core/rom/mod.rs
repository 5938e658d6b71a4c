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

//! ROM model detection
//!
//! Raw ROM dumps carry no header, so the model is inferred from the image
//! size and then narrowed by looking for fixed strings inside it:
//!
//! | Size             | Candidates          | Disambiguation      |
//! |------------------|---------------------|---------------------|
//! | 32 KiB           | TI-81               | version bytes       |
//! | 128 KiB          | TI-82 / TI-83       | `CATALOG`           |
//! | 256 KiB          | TI-85 / TI-86       | `TI-86`             |
//! | 510..=590 KiB    | TI-73 / TI-83 Plus  | `TI-73`             |
//! | 1016..=1030 KiB  | TI-84 Plus          |                     |
//! | 2044..=2260 KiB  | TI-83+ SE / 84+ SE  | `TI-84`             |
//! | 4090..=4100 KiB  | TI-84 Plus C SE     |                     |

use crate::core::error::{CodecError, Result};
use crate::core::model::CalcModel;
use serde::Serialize;

const KB: usize = 1024;

/// Anchor preceding the version string on 128K and 256K ROMs
pub const SELF_TEST_ANCHOR: &[u8] = b"Self Test?";

/// Offset the version scan starts from on flash ROMs
pub const FLASH_VERSION_OFFSET: usize = 0x64;

/// Longest version string copied out of an image
pub const MAX_VERSION_LENGTH: usize = 32;

/// How far past the scan start the first version digit may sit
pub const VERSION_SEARCH_WINDOW: usize = 16;

/// Result of classifying a ROM image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RomInfo {
    pub model: CalcModel,
    pub version: String,
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Scan forward from `start` to the first digit, then copy until a blank,
/// NUL or the end of the image
///
/// The digit must appear within [`VERSION_SEARCH_WINDOW`] bytes of `start`.
pub fn scan_version(rom: &[u8], start: usize) -> String {
    let Some(tail) = rom.get(start..) else {
        return String::new();
    };
    let Some(first_digit) = tail
        .iter()
        .take(VERSION_SEARCH_WINDOW)
        .position(u8::is_ascii_digit)
    else {
        log::warn!(
            "No version digits within {} bytes of 0x{:X}",
            VERSION_SEARCH_WINDOW,
            start
        );
        return String::new();
    };

    tail[first_digit..]
        .iter()
        .take_while(|&&b| b != b' ' && b != 0)
        .take(MAX_VERSION_LENGTH)
        .map(|&b| b as char)
        .collect()
}

fn self_test_version(rom: &[u8]) -> String {
    match find(rom, SELF_TEST_ANCHOR) {
        Some(pos) => scan_version(rom, pos + SELF_TEST_ANCHOR.len()),
        None => {
            log::warn!("ROM has no self test anchor, version unknown");
            String::new()
        }
    }
}

/// TI-81 revisions are told apart by a few fixed bytes
pub fn ti81_version(rom: &[u8]) -> &'static str {
    let byte = |i: usize| rom.get(i).copied().unwrap_or(0);

    if byte(0) == 0xC3 {
        "1.1K"
    } else if byte(1) == 0x16 {
        "1.6K"
    } else if byte(5) == 0x4F {
        "1.8K"
    } else {
        "2.0V"
    }
}

/// Classify a ROM image by size and content
pub fn detect(rom: &[u8]) -> Result<RomInfo> {
    let size = rom.len();

    let (model, version) = if size == 32 * KB {
        (CalcModel::Ti81, ti81_version(rom).to_string())
    } else if size == 128 * KB {
        let model = if contains(rom, b"CATALOG") {
            CalcModel::Ti83
        } else {
            CalcModel::Ti82
        };
        (model, self_test_version(rom))
    } else if size == 256 * KB {
        let model = if contains(rom, b"TI-86") {
            CalcModel::Ti86
        } else {
            CalcModel::Ti85
        };
        (model, self_test_version(rom))
    } else if (510 * KB..=590 * KB).contains(&size) {
        let model = if contains(rom, b"TI-73") {
            CalcModel::Ti73
        } else {
            CalcModel::Ti83P
        };
        (model, scan_version(rom, FLASH_VERSION_OFFSET))
    } else if (1016 * KB..=1030 * KB).contains(&size) {
        (CalcModel::Ti84P, scan_version(rom, FLASH_VERSION_OFFSET))
    } else if (2044 * KB..=2260 * KB).contains(&size) {
        let model = if contains(rom, b"TI-84") {
            CalcModel::Ti84PSE
        } else {
            CalcModel::Ti83PSE
        };
        (model, scan_version(rom, FLASH_VERSION_OFFSET))
    } else if (4090 * KB..=4100 * KB).contains(&size) {
        (CalcModel::Ti84PCSE, scan_version(rom, FLASH_VERSION_OFFSET))
    } else {
        return Err(CodecError::ModelDetection(format!(
            "ROM size {} bytes matches no known model",
            size
        )));
    };

    log::info!("Detected {} ROM, version '{}'", model, version);
    Ok(RomInfo { model, version })
}
