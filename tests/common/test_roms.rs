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

//! Synthetic ROM images
//!
//! Real ROM dumps cannot be shipped, so these carry only the markers the
//! model detector looks at.

const KB: usize = 1024;

fn stamp(rom: &mut [u8], offset: usize, text: &str) {
    rom[offset..offset + text.len()].copy_from_slice(text.as_bytes());
}

/// 128 KiB TI-83 image with a self test version
pub fn ti83_rom(version: &str) -> Vec<u8> {
    let mut rom = vec![0xFF; 128 * KB];
    stamp(&mut rom, 0x1000, "CATALOG");
    stamp(&mut rom, 0x2000, "Self Test? ");
    stamp(&mut rom, 0x200B, version);
    rom[0x200B + version.len()] = 0;
    rom
}

/// 512 KiB TI-83 Plus image with an OS version at 0x64
pub fn ti83p_rom(version: &str) -> Vec<u8> {
    let mut rom = vec![0xFF; 512 * KB];
    stamp(&mut rom, 0x64, version);
    rom[0x64 + version.len()] = 0;
    rom
}

/// 32 KiB TI-81 image of revision 1.8K
pub fn ti81_rom() -> Vec<u8> {
    let mut rom = vec![0x00; 32 * KB];
    rom[5] = 0x4F;
    rom
}
