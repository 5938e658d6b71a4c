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

//! Chunk decoders
//!
//! Each decoder pulls the fields of one hardware block off its chunk in the
//! exact on-disk order. Fields that only exist in some builds are described by
//! [`GatedField`] entries, which either read the field or substitute the
//! documented default.

use super::hardware::*;
use super::{ChunkCatalog, SaveHeader};
use crate::core::chunk::{Chunk, ChunkTag};
use crate::core::error::Result;
use crate::core::model::CalcModel;

/// Build in which the retired MEMC command byte was dropped
pub const MEM_C_CMD_BUILD: u32 = 1;

/// Build that introduced the LCD screen address field
pub const LCD_SCREEN_ADDR_BUILD: u32 = 2;

/// Build that introduced the CPU model bits field
pub const CPU_MODEL_BITS_BUILD: u32 = 2;

/// Build from which stored contrast and base level are trusted
pub const NEW_CONTRAST_MODEL_BUILD: u32 = 3;

/// Range of builds in which an optional field is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Stored from this build onward
    Since(u32),
    /// Stored up to and including this build
    Through(u32),
}

impl Gate {
    pub fn is_open(self, build: u32) -> bool {
        match self {
            Gate::Since(first) => build >= first,
            Gate::Through(last) => build <= last,
        }
    }
}

/// A field whose presence depends on the save's build number
pub struct GatedField<T> {
    pub name: &'static str,
    pub gate: Gate,
    pub decode: fn(&mut Chunk) -> Result<T>,
    pub default: fn(&SaveHeader) -> T,
}

impl<T> GatedField<T> {
    /// Read the field if this build stores it, otherwise use the default
    pub fn read(&self, chunk: &mut Chunk, header: &SaveHeader) -> Result<T> {
        if self.gate.is_open(header.version_build) {
            (self.decode)(chunk)
        } else {
            log::debug!(
                "{} not stored in build {}, using default",
                self.name,
                header.version_build
            );
            Ok((self.default)(header))
        }
    }
}

fn default_model_bits(header: &SaveHeader) -> u32 {
    if header.model == CalcModel::Ti84P {
        0
    } else {
        1
    }
}

fn default_screen_addr(_: &SaveHeader) -> u16 {
    DEFAULT_SCREEN_ADDR
}

fn default_cmd_byte(_: &SaveHeader) -> u8 {
    0
}

fn read_contrast_pair(chunk: &mut Chunk) -> Result<(u32, u32)> {
    Ok((chunk.read_u32()?, chunk.read_u32()?))
}

fn default_contrast_pair(header: &SaveHeader) -> (u32, u32) {
    (LCD_MID_CONTRAST, LcdState::model_base_level(header.model))
}

pub const CPU_MODEL_BITS: GatedField<u32> = GatedField {
    name: "cpu model bits",
    gate: Gate::Since(CPU_MODEL_BITS_BUILD),
    decode: Chunk::read_u32,
    default: default_model_bits,
};

pub const MEM_CMD_BYTE: GatedField<u8> = GatedField {
    name: "memc command byte",
    gate: Gate::Through(MEM_C_CMD_BUILD),
    decode: Chunk::read_u8,
    default: default_cmd_byte,
};

pub const LCD_SCREEN_ADDR: GatedField<u16> = GatedField {
    name: "lcd screen address",
    gate: Gate::Since(LCD_SCREEN_ADDR_BUILD),
    decode: Chunk::read_u16,
    default: default_screen_addr,
};

/// Contrast and base level are always stored, but only trusted from build 3
pub const LCD_CONTRAST: GatedField<(u32, u32)> = GatedField {
    name: "lcd contrast model",
    gate: Gate::Since(NEW_CONTRAST_MODEL_BUILD),
    decode: read_contrast_pair,
    default: default_contrast_pair,
};

fn read_register_set(chunk: &mut Chunk) -> Result<RegisterSet> {
    Ok(RegisterSet {
        a: chunk.read_u8()?,
        f: chunk.read_u8()?,
        b: chunk.read_u8()?,
        c: chunk.read_u8()?,
        d: chunk.read_u8()?,
        e: chunk.read_u8()?,
        h: chunk.read_u8()?,
        l: chunk.read_u8()?,
    })
}

pub fn decode_cpu(chunk: &mut Chunk, header: &SaveHeader) -> Result<CpuState> {
    let main = read_register_set(chunk)?;
    let shadow = read_register_set(chunk)?;

    let mut cpu = CpuState {
        main,
        shadow,
        ixl: chunk.read_u8()?,
        ixh: chunk.read_u8()?,
        iyl: chunk.read_u8()?,
        iyh: chunk.read_u8()?,
        pc: chunk.read_u16()?,
        sp: chunk.read_u16()?,
        i: chunk.read_u8()?,
        r: chunk.read_u8()?,
        bus: chunk.read_u8()?,
        imode: chunk.read_u32()?,
        interrupt: chunk.read_bool32()?,
        ei_block: chunk.read_bool32()?,
        iff1: chunk.read_bool32()?,
        iff2: chunk.read_bool32()?,
        halt: chunk.read_bool32()?,
        read: chunk.read_bool32()?,
        write: chunk.read_bool32()?,
        output: chunk.read_bool32()?,
        input: chunk.read_bool32()?,
        prefix: chunk.read_u32()?,
        pio_interrupts: Vec::with_capacity(PIO_INTERRUPT_COUNT),
        model_bits: 0,
    };

    for _ in 0..PIO_INTERRUPT_COUNT {
        cpu.pio_interrupts.push(PioInterrupt {
            interrupt_val: chunk.read_i32()?,
            skip_factor: chunk.read_i32()?,
            skip_count: chunk.read_i32()?,
        });
    }

    cpu.model_bits = CPU_MODEL_BITS.read(chunk, header)?;
    Ok(cpu)
}

fn read_breakpoints(
    catalog: &mut ChunkCatalog,
    count_tag: ChunkTag,
    list_tag: ChunkTag,
    is_ram: bool,
) -> Result<Vec<Breakpoint>> {
    let count = match catalog.find(count_tag) {
        Some(chunk) => chunk.read_u32()?,
        None => return Ok(Vec::new()),
    };
    let Some(list) = catalog.find(list_tag) else {
        log::warn!("{} present without {}", count_tag, list_tag);
        return Ok(Vec::new());
    };

    let mut breaks = Vec::new();
    for _ in 0..count {
        let addr = list.read_u32()?;
        let kind = BreakKind::from_type(list.read_u32()?);
        breaks.push(Breakpoint::from_flat(addr, kind, is_ram));
    }
    Ok(breaks)
}

pub fn decode_memory(catalog: &mut ChunkCatalog, header: &SaveHeader) -> Result<MemoryState> {
    let mut mem = MemoryState::default();

    let chunk = catalog.require(ChunkTag::MEM)?;
    mem.flash_size = chunk.read_u32()?;
    chunk.read_u32()?; // reserved
    mem.ram_size = chunk.read_u32()?;
    chunk.read_u32()?; // reserved
    mem.flash_step = chunk.read_u32()?;
    MEM_CMD_BYTE.read(chunk, header)?;
    mem.boot_mapped = chunk.read_bool32()?;
    mem.flash_locked = chunk.read_bool32()?;
    mem.flash_version = chunk.read_u32()?;

    for bank in mem.banks.iter_mut() {
        *bank = BankState {
            page: chunk.read_u32()?,
            read_only: chunk.read_bool32()?,
            ram: chunk.read_bool32()?,
            no_exec: chunk.read_bool32()?,
        };
    }

    mem.timings = MemoryTimings {
        read_op_flash: chunk.read_i32()?,
        read_nop_flash: chunk.read_i32()?,
        write_flash: chunk.read_i32()?,
        read_op_ram: chunk.read_i32()?,
        read_nop_ram: chunk.read_i32()?,
        write_ram: chunk.read_i32()?,
    };
    mem.flash_upper = chunk.read_u32()?;
    mem.flash_lower = chunk.read_u32()?;

    mem.flash = catalog
        .require(ChunkTag::ROM)?
        .read_block(mem.flash_size as usize)?;
    mem.ram = catalog
        .require(ChunkTag::RAM)?
        .read_block(mem.ram_size as usize)?;

    if let Some(chunk) = catalog.find(ChunkTag::REMAP) {
        mem.remap = Some(RemapState {
            port27: chunk.read_u32()?,
            port28: chunk.read_u32()?,
        });
    }

    if let Some(chunk) = catalog.find(ChunkTag::RAM_LIMIT) {
        mem.ram_limits = Some(RamLimits {
            upper: chunk.read_u32()?,
            lower: chunk.read_u32()?,
        });
    }

    mem.breakpoints = read_breakpoints(
        catalog,
        ChunkTag::NUM_FLASH_BREAKS,
        ChunkTag::FLASH_BREAKS,
        false,
    )?;
    mem.breakpoints.extend(read_breakpoints(
        catalog,
        ChunkTag::NUM_RAM_BREAKS,
        ChunkTag::RAM_BREAKS,
        true,
    )?);

    Ok(mem)
}

pub fn decode_timer(chunk: &mut Chunk) -> Result<TimerState> {
    Ok(TimerState {
        tstates: chunk.read_u64()?,
        freq: chunk.read_u64()?,
        elapsed: chunk.read_f64()?,
        last_time: chunk.read_f64()?,
    })
}

fn read_lcd_timing(chunk: &mut Chunk) -> Result<LcdTiming> {
    Ok(LcdTiming {
        time: chunk.read_f64()?,
        ufps: chunk.read_f64()?,
        ufps_last: chunk.read_f64()?,
        last_gif_frame: chunk.read_f64()?,
        write_avg: chunk.read_f64()?,
        write_last: chunk.read_f64()?,
    })
}

pub fn decode_lcd(chunk: &mut Chunk, header: &SaveHeader) -> Result<LcdState> {
    let active = chunk.read_bool32()?;
    let word_len = chunk.read_u32()?;
    let x = chunk.read_u32()?;
    let y = chunk.read_u32()?;
    let z = chunk.read_u32()?;
    let cursor_mode = chunk.read_u32()?;
    let (contrast, base_level) = LCD_CONTRAST.read(chunk, header)?;
    if !LCD_CONTRAST.gate.is_open(header.version_build) {
        // the stale pair is still on disk
        read_contrast_pair(chunk)?;
    }
    let display = chunk.read_block(DISPLAY_SIZE)?;
    let front = chunk.read_u32()?;

    let mut queue = Vec::with_capacity(LCD_MAX_SHADES);
    for _ in 0..LCD_MAX_SHADES {
        queue.push(chunk.read_block(DISPLAY_SIZE)?);
    }

    Ok(LcdState {
        active,
        word_len,
        x,
        y,
        z,
        cursor_mode,
        contrast,
        base_level,
        display,
        front,
        queue,
        shades: chunk.read_u32()?,
        mode: chunk.read_u32()?,
        timing: read_lcd_timing(chunk)?,
        screen_addr: LCD_SCREEN_ADDR.read(chunk, header)?,
    })
}

pub fn decode_color_lcd(chunk: &mut Chunk) -> Result<ColorLcdState> {
    Ok(ColorLcdState {
        active: chunk.read_bool32()?,
        x: chunk.read_u32()?,
        y: chunk.read_u32()?,
        z: chunk.read_u32()?,
        cursor_mode: chunk.read_u32()?,
        contrast: chunk.read_u32()?,
        timing: read_lcd_timing(chunk)?,
        display: chunk.read_block(COLOR_LCD_DISPLAY_SIZE)?,
        queued_image: chunk.read_block(COLOR_LCD_DISPLAY_SIZE)?,
        registers: chunk.read_block(COLOR_LCD_REGISTER_COUNT)?,
        current_register: chunk.read_u32()?,
        read_buffer: chunk.read_u32()?,
        write_buffer: chunk.read_u32()?,
        read_step: chunk.read_u32()?,
        write_step: chunk.read_u32()?,
        frame_rate: chunk.read_u32()?,
        front: chunk.read_u32()?,
    })
}

pub fn decode_link(chunk: &mut Chunk) -> Result<LinkState> {
    Ok(LinkState {
        host: chunk.read_u8()?,
    })
}

pub fn decode_stdint(chunk: &mut Chunk) -> Result<StdIntState> {
    let int_active = chunk.read_u8()?;
    let lastchk1 = chunk.read_f64()?;
    let timermax1 = chunk.read_f64()?;
    let lastchk2 = chunk.read_f64()?;
    let timermax2 = chunk.read_f64()?;

    let mut freq = [0.0; 4];
    for f in freq.iter_mut() {
        *f = chunk.read_f64()?;
    }

    Ok(StdIntState {
        int_active,
        lastchk1,
        timermax1,
        lastchk2,
        timermax2,
        freq,
        mem: chunk.read_u32()?,
        xy: chunk.read_u32()?,
    })
}

pub fn decode_link_assist(chunk: &mut Chunk) -> Result<LinkAssistState> {
    Ok(LinkAssistState {
        link_enable: chunk.read_u8()?,
        input: chunk.read_u8()?,
        output: chunk.read_u8()?,
        working: chunk.read_u8()?,
        receiving: chunk.read_bool32()?,
        read: chunk.read_bool32()?,
        ready: chunk.read_bool32()?,
        error: chunk.read_bool32()?,
        sending: chunk.read_bool32()?,
        last_access: chunk.read_f64()?,
        bit: chunk.read_u32()?,
    })
}

fn read_xtal_timer(chunk: &mut Chunk) -> Result<XtalTimer> {
    Ok(XtalTimer {
        last_tstates: chunk.read_u64()?,
        last_ticks: chunk.read_f64()?,
        divisor: chunk.read_f64()?,
        looping: chunk.read_bool32()?,
        interrupt: chunk.read_bool32()?,
        underflow: chunk.read_bool32()?,
        generate: chunk.read_bool32()?,
        active: chunk.read_bool32()?,
        clock: chunk.read_u8()?,
        count: chunk.read_u8()?,
        max: chunk.read_u8()?,
    })
}

/// Decode the SE auxiliary block, returning the CPU model bits it carries
/// from minor version 1 onward
pub fn decode_se_aux(chunk: &mut Chunk, header: &SaveHeader) -> Result<(SeAuxState, Option<u32>)> {
    let clock = ClockState {
        enable: chunk.read_u8()?,
        set: chunk.read_u32()?,
        base: chunk.read_u32()?,
        last_time: chunk.read_f64()?,
    };

    let mut delay = [0u8; 7];
    for d in delay.iter_mut() {
        *d = chunk.read_u8()?;
    }

    let mut regs = [0u32; 6];
    for r in regs.iter_mut() {
        *r = chunk.read_u32()?;
    }
    let md5 = Md5State {
        regs,
        s: chunk.read_u8()?,
        mode: chunk.read_u8()?,
    };

    let link_assist = decode_link_assist(chunk)?;

    let last_time = chunk.read_f64()?;
    let ticks = chunk.read_u64()?;
    let timers = [
        read_xtal_timer(chunk)?,
        read_xtal_timer(chunk)?,
        read_xtal_timer(chunk)?,
    ];

    let model_bits = if header.version_minor >= 1 {
        Some(chunk.read_u32()?)
    } else {
        None
    };

    let state = SeAuxState {
        clock,
        delay,
        md5,
        link_assist,
        xtal: XtalState {
            last_time,
            ticks,
            timers,
        },
        usb: None,
    };
    Ok((state, model_bits))
}

pub fn decode_usb(chunk: &mut Chunk) -> Result<UsbState> {
    Ok(UsbState {
        line_state: chunk.read_u32()?,
        events: chunk.read_u32()?,
        event_mask: chunk.read_u32()?,
        line_interrupt: chunk.read_bool32()?,
        protocol_interrupt: chunk.read_bool32()?,
        protocol_interrupt_enabled: chunk.read_bool32()?,
        dev_address: chunk.read_u32()?,
        port4a: chunk.read_u8()?,
        port4c: chunk.read_u8()?,
        port54: chunk.read_u8()?,
    })
}

/// Whether `SEAX` holds only the link-assist block
pub fn seax_is_link_assist_only(header: &SaveHeader) -> bool {
    header.model < CalcModel::Ti83PSE && header.version_minor == 1
}

impl MachineState {
    /// Decode every block the target hardware carries
    ///
    /// Nothing is applied here; a failure anywhere leaves the caller with an
    /// error and no partial state.
    pub fn decode(
        catalog: &mut ChunkCatalog,
        header: &SaveHeader,
        profile: HardwareProfile,
    ) -> Result<Self> {
        let mut cpu = decode_cpu(catalog.require(ChunkTag::CPU)?, header)?;
        let memory = decode_memory(catalog, header)?;
        let timer = decode_timer(catalog.require(ChunkTag::TIMER)?)?;

        let lcd_chunk = catalog.require(ChunkTag::LCD)?;
        let lcd = if profile.model.has_color_lcd() {
            LcdSnapshot::Color(decode_color_lcd(lcd_chunk)?)
        } else {
            LcdSnapshot::Mono(decode_lcd(lcd_chunk, header)?)
        };

        let link = decode_link(catalog.require(ChunkTag::LINK)?)?;
        let stdint = decode_stdint(catalog.require(ChunkTag::STDINT)?)?;

        let link_assist_only = seax_is_link_assist_only(header);

        let link_assist = if profile.link_assist && link_assist_only {
            catalog
                .find(ChunkTag::SE_AUX)
                .map(decode_link_assist)
                .transpose()?
        } else {
            None
        };

        let mut se_aux = None;
        if profile.se_aux && !link_assist_only {
            if let Some(chunk) = catalog.find(ChunkTag::SE_AUX) {
                let (mut state, model_bits) = decode_se_aux(chunk, header)?;
                if let Some(bits) = model_bits {
                    cpu.model_bits = bits;
                }
                state.usb = catalog.find(ChunkTag::USB).map(decode_usb).transpose()?;
                se_aux = Some(state);
            }
        }

        log::debug!(
            "Decoded machine state for {} (build {})",
            profile.model,
            header.version_build
        );

        Ok(Self {
            cpu,
            memory,
            timer,
            lcd,
            link,
            stdint,
            link_assist,
            se_aux,
        })
    }
}
