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

//! Chunk encoders
//!
//! Mirrors of the decoders in `decode.rs`, always writing the current build's
//! layout (every gated field present, no retired command byte).

use super::hardware::*;
use crate::core::chunk::{Chunk, ChunkTag, ChunkWriter};
use crate::core::model::CalcModel;

fn write_register_set(w: &mut ChunkWriter, regs: &RegisterSet) {
    w.write_u8(regs.a)
        .write_u8(regs.f)
        .write_u8(regs.b)
        .write_u8(regs.c)
        .write_u8(regs.d)
        .write_u8(regs.e)
        .write_u8(regs.h)
        .write_u8(regs.l);
}

pub fn encode_cpu(cpu: &CpuState) -> Chunk {
    let mut w = ChunkWriter::new();
    write_register_set(&mut w, &cpu.main);
    write_register_set(&mut w, &cpu.shadow);
    w.write_u8(cpu.ixl)
        .write_u8(cpu.ixh)
        .write_u8(cpu.iyl)
        .write_u8(cpu.iyh)
        .write_u16(cpu.pc)
        .write_u16(cpu.sp)
        .write_u8(cpu.i)
        .write_u8(cpu.r)
        .write_u8(cpu.bus)
        .write_u32(cpu.imode)
        .write_bool32(cpu.interrupt)
        .write_bool32(cpu.ei_block)
        .write_bool32(cpu.iff1)
        .write_bool32(cpu.iff2)
        .write_bool32(cpu.halt)
        .write_bool32(cpu.read)
        .write_bool32(cpu.write)
        .write_bool32(cpu.output)
        .write_bool32(cpu.input)
        .write_u32(cpu.prefix);

    // The table is fixed size on disk
    for i in 0..PIO_INTERRUPT_COUNT {
        let pio = cpu.pio_interrupts.get(i).copied().unwrap_or_default();
        w.write_i32(pio.interrupt_val)
            .write_i32(pio.skip_factor)
            .write_i32(pio.skip_count);
    }

    w.write_u32(cpu.model_bits);
    w.finish(ChunkTag::CPU)
}

/// Write `data` padded or cut to exactly `len` bytes
fn write_sized(w: &mut ChunkWriter, data: &[u8], len: usize) {
    let take = data.len().min(len);
    w.write_block(&data[..take]);
    if take < len {
        w.write_block(&vec![0; len - take]);
    }
}

fn encode_breakpoints(breaks: &[&Breakpoint], count_tag: ChunkTag, list_tag: ChunkTag) -> [Chunk; 2] {
    let mut count = ChunkWriter::new();
    count.write_u32(breaks.len() as u32);

    let mut list = ChunkWriter::new();
    for bp in breaks {
        list.write_u32(bp.flat_addr()).write_u32(bp.kind.type_code());
    }

    [count.finish(count_tag), list.finish(list_tag)]
}

/// Encode `MEMC`, `ROM `, `RAM ` and whichever optional memory chunks apply
pub fn encode_memory(mem: &MemoryState) -> Vec<Chunk> {
    let mut w = ChunkWriter::new();
    w.write_u32(mem.flash_size)
        .write_u32(0)
        .write_u32(mem.ram_size)
        .write_u32(0)
        .write_u32(mem.flash_step)
        .write_bool32(mem.boot_mapped)
        .write_bool32(mem.flash_locked)
        .write_u32(mem.flash_version);

    for bank in &mem.banks {
        w.write_u32(bank.page)
            .write_bool32(bank.read_only)
            .write_bool32(bank.ram)
            .write_bool32(bank.no_exec);
    }

    let t = &mem.timings;
    w.write_i32(t.read_op_flash)
        .write_i32(t.read_nop_flash)
        .write_i32(t.write_flash)
        .write_i32(t.read_op_ram)
        .write_i32(t.read_nop_ram)
        .write_i32(t.write_ram)
        .write_u32(mem.flash_upper)
        .write_u32(mem.flash_lower);

    let mut chunks = vec![w.finish(ChunkTag::MEM)];

    let mut rom = ChunkWriter::new();
    write_sized(&mut rom, &mem.flash, mem.flash_size as usize);
    chunks.push(rom.finish(ChunkTag::ROM));

    let mut ram = ChunkWriter::new();
    write_sized(&mut ram, &mem.ram, mem.ram_size as usize);
    chunks.push(ram.finish(ChunkTag::RAM));

    if let Some(remap) = mem.remap {
        let mut w = ChunkWriter::new();
        w.write_u32(remap.port27).write_u32(remap.port28);
        chunks.push(w.finish(ChunkTag::REMAP));
    }

    if let Some(limits) = mem.ram_limits {
        let mut w = ChunkWriter::new();
        w.write_u32(limits.upper).write_u32(limits.lower);
        chunks.push(w.finish(ChunkTag::RAM_LIMIT));
    }

    let (ram_breaks, flash_breaks): (Vec<&Breakpoint>, Vec<&Breakpoint>) =
        mem.breakpoints.iter().partition(|bp| bp.is_ram);
    if !flash_breaks.is_empty() {
        chunks.extend(encode_breakpoints(
            &flash_breaks,
            ChunkTag::NUM_FLASH_BREAKS,
            ChunkTag::FLASH_BREAKS,
        ));
    }
    if !ram_breaks.is_empty() {
        chunks.extend(encode_breakpoints(
            &ram_breaks,
            ChunkTag::NUM_RAM_BREAKS,
            ChunkTag::RAM_BREAKS,
        ));
    }

    chunks
}

pub fn encode_timer(timer: &TimerState) -> Chunk {
    let mut w = ChunkWriter::new();
    w.write_u64(timer.tstates)
        .write_u64(timer.freq)
        .write_f64(timer.elapsed)
        .write_f64(timer.last_time);
    w.finish(ChunkTag::TIMER)
}

fn write_lcd_timing(w: &mut ChunkWriter, t: &LcdTiming) {
    w.write_f64(t.time)
        .write_f64(t.ufps)
        .write_f64(t.ufps_last)
        .write_f64(t.last_gif_frame)
        .write_f64(t.write_avg)
        .write_f64(t.write_last);
}

pub fn encode_lcd(lcd: &LcdSnapshot) -> Chunk {
    let mut w = ChunkWriter::new();
    match lcd {
        LcdSnapshot::Mono(lcd) => {
            w.write_bool32(lcd.active)
                .write_u32(lcd.word_len)
                .write_u32(lcd.x)
                .write_u32(lcd.y)
                .write_u32(lcd.z)
                .write_u32(lcd.cursor_mode)
                .write_u32(lcd.contrast)
                .write_u32(lcd.base_level);
            write_sized(&mut w, &lcd.display, DISPLAY_SIZE);
            w.write_u32(lcd.front);
            for i in 0..LCD_MAX_SHADES {
                let frame = lcd.queue.get(i).map(Vec::as_slice).unwrap_or(&[]);
                write_sized(&mut w, frame, DISPLAY_SIZE);
            }
            w.write_u32(lcd.shades).write_u32(lcd.mode);
            write_lcd_timing(&mut w, &lcd.timing);
            w.write_u16(lcd.screen_addr);
        }
        LcdSnapshot::Color(lcd) => {
            w.write_bool32(lcd.active)
                .write_u32(lcd.x)
                .write_u32(lcd.y)
                .write_u32(lcd.z)
                .write_u32(lcd.cursor_mode)
                .write_u32(lcd.contrast);
            write_lcd_timing(&mut w, &lcd.timing);
            write_sized(&mut w, &lcd.display, COLOR_LCD_DISPLAY_SIZE);
            write_sized(&mut w, &lcd.queued_image, COLOR_LCD_DISPLAY_SIZE);
            write_sized(&mut w, &lcd.registers, COLOR_LCD_REGISTER_COUNT);
            w.write_u32(lcd.current_register)
                .write_u32(lcd.read_buffer)
                .write_u32(lcd.write_buffer)
                .write_u32(lcd.read_step)
                .write_u32(lcd.write_step)
                .write_u32(lcd.frame_rate)
                .write_u32(lcd.front);
        }
    }
    w.finish(ChunkTag::LCD)
}

pub fn encode_link(link: &LinkState) -> Chunk {
    let mut w = ChunkWriter::new();
    w.write_u8(link.host);
    w.finish(ChunkTag::LINK)
}

pub fn encode_stdint(stdint: &StdIntState) -> Chunk {
    let mut w = ChunkWriter::new();
    w.write_u8(stdint.int_active)
        .write_f64(stdint.lastchk1)
        .write_f64(stdint.timermax1)
        .write_f64(stdint.lastchk2)
        .write_f64(stdint.timermax2);
    for f in stdint.freq {
        w.write_f64(f);
    }
    w.write_u32(stdint.mem).write_u32(stdint.xy);
    w.finish(ChunkTag::STDINT)
}

fn write_link_assist(w: &mut ChunkWriter, la: &LinkAssistState) {
    w.write_u8(la.link_enable)
        .write_u8(la.input)
        .write_u8(la.output)
        .write_u8(la.working)
        .write_bool32(la.receiving)
        .write_bool32(la.read)
        .write_bool32(la.ready)
        .write_bool32(la.error)
        .write_bool32(la.sending)
        .write_f64(la.last_access)
        .write_u32(la.bit);
}

pub fn encode_link_assist(la: &LinkAssistState) -> Chunk {
    let mut w = ChunkWriter::new();
    write_link_assist(&mut w, la);
    w.finish(ChunkTag::SE_AUX)
}

/// Encode `SEAX` (and `USB ` when present) in the current minor layout
pub fn encode_se_aux(aux: &SeAuxState, model_bits: u32) -> Vec<Chunk> {
    let mut w = ChunkWriter::new();
    w.write_u8(aux.clock.enable)
        .write_u32(aux.clock.set)
        .write_u32(aux.clock.base)
        .write_f64(aux.clock.last_time)
        .write_block(&aux.delay);
    for r in aux.md5.regs {
        w.write_u32(r);
    }
    w.write_u8(aux.md5.s).write_u8(aux.md5.mode);
    write_link_assist(&mut w, &aux.link_assist);

    w.write_f64(aux.xtal.last_time).write_u64(aux.xtal.ticks);
    for t in &aux.xtal.timers {
        w.write_u64(t.last_tstates)
            .write_f64(t.last_ticks)
            .write_f64(t.divisor)
            .write_bool32(t.looping)
            .write_bool32(t.interrupt)
            .write_bool32(t.underflow)
            .write_bool32(t.generate)
            .write_bool32(t.active)
            .write_u8(t.clock)
            .write_u8(t.count)
            .write_u8(t.max);
    }
    w.write_u32(model_bits);

    let mut chunks = vec![w.finish(ChunkTag::SE_AUX)];

    if let Some(usb) = aux.usb {
        let mut w = ChunkWriter::new();
        w.write_u32(usb.line_state)
            .write_u32(usb.events)
            .write_u32(usb.event_mask)
            .write_bool32(usb.line_interrupt)
            .write_bool32(usb.protocol_interrupt)
            .write_bool32(usb.protocol_interrupt_enabled)
            .write_u32(usb.dev_address)
            .write_u8(usb.port4a)
            .write_u8(usb.port4c)
            .write_u8(usb.port54);
        chunks.push(w.finish(ChunkTag::USB));
    }

    chunks
}

impl MachineState {
    /// Encode every block into chunks, in table order
    pub fn encode(&self, model: CalcModel) -> Vec<Chunk> {
        let mut chunks = vec![encode_cpu(&self.cpu)];
        chunks.extend(encode_memory(&self.memory));
        chunks.push(encode_timer(&self.timer));
        chunks.push(encode_lcd(&self.lcd));
        chunks.push(encode_link(&self.link));
        chunks.push(encode_stdint(&self.stdint));

        // Current minor: models below the SE store link assist alone in SEAX
        if model < CalcModel::Ti83PSE {
            if let Some(la) = &self.link_assist {
                chunks.push(encode_link_assist(la));
            }
        } else if let Some(aux) = &self.se_aux {
            chunks.extend(encode_se_aux(aux, self.cpu.model_bits));
        }

        chunks
    }
}
