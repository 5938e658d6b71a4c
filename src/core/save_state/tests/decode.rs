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

//! Block decoding and version gate tests

use super::super::*;
use super::helpers::*;
use crate::core::chunk::ChunkWriter;

fn decode_bytes(bytes: &[u8], model: CalcModel) -> Result<MachineState> {
    let mut save = SaveState::read(bytes)?;
    save.decode(HardwareProfile::for_model(model))
}

fn mono(lcd: &LcdSnapshot) -> &LcdState {
    match lcd {
        LcdSnapshot::Mono(lcd) => lcd,
        LcdSnapshot::Color(_) => panic!("expected a monochrome LCD"),
    }
}

#[test]
fn test_gate_ranges() {
    assert!(Gate::Since(2).is_open(2));
    assert!(Gate::Since(2).is_open(3));
    assert!(!Gate::Since(2).is_open(1));
    assert!(Gate::Through(1).is_open(0));
    assert!(Gate::Through(1).is_open(1));
    assert!(!Gate::Through(1).is_open(2));
}

#[test]
fn test_current_build_round_trip() {
    for model in [CalcModel::Ti83, CalcModel::Ti83P, CalcModel::Ti84PSE] {
        let state = sample_state(model);
        let decoded = decode_bytes(&save_bytes(model, &state), model).unwrap();
        assert_eq!(decoded, state, "{model}");
    }
}

#[test]
fn test_color_lcd_round_trip() {
    let model = CalcModel::Ti84PCSE;
    let state = sample_state(model);
    let decoded = decode_bytes(&save_bytes(model, &state), model).unwrap();

    match &decoded.lcd {
        LcdSnapshot::Color(lcd) => {
            assert_eq!(lcd.x, 10);
            assert_eq!(lcd.current_register, 0x22);
            assert_eq!(lcd.registers.len(), COLOR_LCD_REGISTER_COUNT);
            assert_eq!(lcd.display.len(), COLOR_LCD_DISPLAY_SIZE);
        }
        LcdSnapshot::Mono(_) => panic!("expected a colour LCD"),
    }
    assert_eq!(decoded, state);
}

#[test]
fn test_build_1_uses_screen_addr_default() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let bytes = legacy_save_bytes(model, &state, 1);

    let decoded = decode_bytes(&bytes, model).unwrap();
    assert_eq!(mono(&decoded.lcd).screen_addr, 0xFC00);
}

#[test]
fn test_build_1_ignores_stored_screen_addr() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let legacy = SaveState::read(&legacy_save_bytes(model, &state, 1)).unwrap();

    // Same build-1 file, but the LCD chunk still ends in an address
    let mut save = SaveState::new(model, "old", "legacy");
    for chunk in legacy.chunks().iter() {
        let chunk = if chunk.tag() == ChunkTag::LCD {
            patched(chunk, |d| d.extend_from_slice(&0x1234u16.to_le_bytes()))
        } else {
            chunk.clone()
        };
        save.insert_chunk(chunk);
    }
    let mut bytes = save.to_bytes().unwrap();
    bytes[20..24].copy_from_slice(&1u32.to_le_bytes());

    let decoded = decode_bytes(&bytes, model).unwrap();
    assert_eq!(mono(&decoded.lcd).screen_addr, DEFAULT_SCREEN_ADDR);
    assert_eq!(mono(&decoded.lcd).shades, 6);
}

#[test]
fn test_build_1_model_bits_default() {
    let state = sample_state(CalcModel::Ti83);
    let bytes = legacy_save_bytes(CalcModel::Ti83, &state, 1);
    assert_eq!(decode_bytes(&bytes, CalcModel::Ti83).unwrap().cpu.model_bits, 1);

    let mut state = sample_state(CalcModel::Ti84P);
    state.se_aux = None;
    let bytes = legacy_save_bytes(CalcModel::Ti84P, &state, 1);
    assert_eq!(decode_bytes(&bytes, CalcModel::Ti84P).unwrap().cpu.model_bits, 0);
}

#[test]
fn test_build_1_skips_command_byte() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let bytes = legacy_save_bytes(model, &state, 1);

    let decoded = decode_bytes(&bytes, model).unwrap();
    assert_eq!(decoded.memory.flash_step, 3);
    assert!(decoded.memory.boot_mapped);
    assert_eq!(decoded.memory.banks, state.memory.banks);
    assert_eq!(decoded.memory.flash, state.memory.flash);
}

#[test]
fn test_build_2_resets_contrast_model() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let bytes = legacy_save_bytes(model, &state, 2);

    let decoded = decode_bytes(&bytes, model).unwrap();
    let lcd = mono(&decoded.lcd);
    assert_eq!(lcd.contrast, LCD_MID_CONTRAST);
    assert_eq!(lcd.base_level, LcdState::model_base_level(model));
    // Fields after the contrast pair still line up
    assert_eq!(lcd.screen_addr, 0xF000);
    assert_eq!(lcd.shades, 6);
    assert_eq!(decoded.cpu.model_bits, 1);
}

#[test]
fn test_missing_required_chunk() {
    let model = CalcModel::Ti83;
    let state = sample_state(model);

    let mut save = SaveState::new(model, "", "");
    for chunk in state.encode(model) {
        if chunk.tag() != ChunkTag::TIMER {
            save.insert_chunk(chunk);
        }
    }
    let bytes = save.to_bytes().unwrap();

    assert!(matches!(
        decode_bytes(&bytes, model),
        Err(CodecError::MissingChunk(tag)) if tag == "TIME"
    ));
}

#[test]
fn test_short_chunk_is_overrun() {
    let model = CalcModel::Ti83;
    let state = sample_state(model);

    let mut save = SaveState::new(model, "", "");
    for chunk in state.encode(model) {
        let chunk = if chunk.tag() == ChunkTag::STDINT {
            patched(&chunk, |d| d.truncate(10))
        } else {
            chunk
        };
        save.insert_chunk(chunk);
    }
    let bytes = save.to_bytes().unwrap();

    assert!(matches!(
        decode_bytes(&bytes, model),
        Err(CodecError::ChunkOverrun { tag, .. }) if tag == "STDI"
    ));
}

#[test]
fn test_rom_shorter_than_flash_size() {
    let model = CalcModel::Ti83;
    let state = sample_state(model);

    let mut save = SaveState::new(model, "", "");
    for chunk in state.encode(model) {
        let chunk = if chunk.tag() == ChunkTag::ROM {
            patched(&chunk, |d| d.truncate(100))
        } else {
            chunk
        };
        save.insert_chunk(chunk);
    }

    assert!(matches!(
        decode_bytes(&save.to_bytes().unwrap(), model),
        Err(CodecError::ChunkOverrun { .. })
    ));
}

#[test]
fn test_breakpoint_kinds() {
    let mut catalog = ChunkCatalog::new();

    let mut count = ChunkWriter::new();
    count.write_u32(3);
    catalog.insert(count.finish(ChunkTag::NUM_FLASH_BREAKS));

    let mut list = ChunkWriter::new();
    list.write_u32(0x8005)
        .write_u32(MEM_READ_BREAK)
        .write_u32(0x4001)
        .write_u32(MEM_WRITE_BREAK)
        .write_u32(0x0010)
        .write_u32(0x99);
    catalog.insert(list.finish(ChunkTag::FLASH_BREAKS));

    let state = sample_state(CalcModel::Ti83);
    for chunk in encode_memory(&MemoryState {
        breakpoints: Vec::new(),
        ..state.memory
    }) {
        catalog.insert(chunk);
    }

    let header = SaveHeader::current(CalcModel::Ti83);
    let mem = decode_memory(&mut catalog, &header).unwrap();

    assert_eq!(
        mem.breakpoints,
        vec![
            Breakpoint {
                kind: BreakKind::Read,
                page: 2,
                offset: 5,
                is_ram: false
            },
            Breakpoint {
                kind: BreakKind::Write,
                page: 1,
                offset: 1,
                is_ram: false
            },
            Breakpoint {
                kind: BreakKind::Normal,
                page: 0,
                offset: 0x10,
                is_ram: false
            },
        ]
    );
}

#[test]
fn test_ram_breakpoints_come_from_ram_chunks() {
    let model = CalcModel::Ti83;
    let state = sample_state(model);
    let decoded = decode_bytes(&save_bytes(model, &state), model).unwrap();

    let ram: Vec<_> = decoded
        .memory
        .breakpoints
        .iter()
        .filter(|bp| bp.is_ram)
        .collect();
    assert_eq!(ram.len(), 1);
    assert_eq!(ram[0].flat_addr(), 0x0042);
    assert_eq!(ram[0].kind, BreakKind::Write);
}

#[test]
fn test_optional_memory_chunks_absent() {
    let model = CalcModel::Ti83;
    let mut state = sample_state(model);
    state.memory.remap = None;
    state.memory.ram_limits = None;
    state.memory.breakpoints.clear();

    let decoded = decode_bytes(&save_bytes(model, &state), model).unwrap();
    assert_eq!(decoded.memory.remap, None);
    assert_eq!(decoded.memory.ram_limits, None);
    assert!(decoded.memory.breakpoints.is_empty());
}

#[test]
fn test_83p_seax_holds_link_assist() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let bytes = save_bytes(model, &state);

    let decoded = decode_bytes(&bytes, model).unwrap();
    let la = decoded.link_assist.unwrap();
    assert_eq!(la.link_enable, 0x80);
    assert!(la.ready);
    assert_eq!(la.bit, 3);
    assert!(decoded.se_aux.is_none());
}

#[test]
fn test_83p_minor_0_ignores_seax() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let mut bytes = save_bytes(model, &state);
    set_minor(&mut bytes, 0);

    let decoded = decode_bytes(&bytes, model).unwrap();
    assert!(decoded.link_assist.is_none());
}

#[test]
fn test_se_aux_carries_model_bits() {
    let model = CalcModel::Ti84PSE;
    let mut state = sample_state(model);
    state.cpu.model_bits = 1;

    let mut save = SaveState::new(model, "", "");
    for chunk in state.encode(model) {
        // CPU says 0, SEAX says 1: SEAX wins
        let chunk = if chunk.tag() == ChunkTag::CPU {
            patched(&chunk, |d| {
                let n = d.len();
                d[n - 4..].copy_from_slice(&0u32.to_le_bytes());
            })
        } else {
            chunk
        };
        save.insert_chunk(chunk);
    }

    let decoded = decode_bytes(&save.to_bytes().unwrap(), model).unwrap();
    assert_eq!(decoded.cpu.model_bits, 1);
    let aux = decoded.se_aux.unwrap();
    assert_eq!(aux.md5.regs, [10, 20, 30, 40, 50, 60]);
    assert_eq!(aux.usb.unwrap().port54, 0x54);
}

#[test]
fn test_se_aux_minor_0_has_no_model_bits() {
    let model = CalcModel::Ti84PSE;
    let state = sample_state(model);

    let mut save = SaveState::new(model, "", "");
    for chunk in state.encode(model) {
        let chunk = if chunk.tag() == ChunkTag::SE_AUX {
            patched(&chunk, |d| d.truncate(d.len() - 4))
        } else {
            chunk
        };
        save.insert_chunk(chunk);
    }
    let mut bytes = save.to_bytes().unwrap();
    set_minor(&mut bytes, 0);

    let decoded = decode_bytes(&bytes, model).unwrap();
    assert_eq!(decoded.cpu.model_bits, state.cpu.model_bits);
    assert_eq!(decoded.se_aux.unwrap().clock.base, 2000);
}

#[test]
fn test_se_without_usb_chunk() {
    let model = CalcModel::Ti83PSE;
    let mut state = sample_state(model);
    if let Some(aux) = state.se_aux.as_mut() {
        aux.usb = None;
    }

    let decoded = decode_bytes(&save_bytes(model, &state), model).unwrap();
    assert_eq!(decoded.se_aux.unwrap().usb, None);
}

#[test]
fn test_pio_table_length() {
    let model = CalcModel::Ti86;
    let state = sample_state(model);
    let cpu_chunk = encode_cpu(&state.cpu);

    // 16 registers, index halves, PC/SP, I/R/bus, imode, 9 flags, prefix, PIO table, model bits
    assert_eq!(cpu_chunk.size(), 8 + 8 + 4 + 4 + 3 + 4 + 9 * 4 + 4 + 256 * 12 + 4);

    let decoded = decode_bytes(&save_bytes(model, &state), model).unwrap();
    assert_eq!(decoded.cpu.pio_interrupts.len(), PIO_INTERRUPT_COUNT);
    assert_eq!(decoded.cpu.pio_interrupts[3].skip_count, 7);
}
