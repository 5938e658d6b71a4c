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

//! Shared fixtures for save state tests

use super::super::*;
use serde::{Deserialize, Serialize};

/// A hardware block that just stores whatever state it is given
pub struct Slot<T> {
    pub state: T,
    pub restored: bool,
}

impl<T> Slot<T> {
    pub fn new(state: T) -> Self {
        Self {
            state,
            restored: false,
        }
    }
}

impl<T> StateSave for Slot<T>
where
    T: Clone + Serialize + for<'de> Deserialize<'de>,
{
    type State = T;

    fn to_state(&self) -> T {
        self.state.clone()
    }

    fn restore_from_state(&mut self, state: &T) {
        self.state = state.clone();
        self.restored = true;
    }
}

pub struct MockCalculator {
    pub model: CalcModel,
    pub cpu: Slot<CpuState>,
    pub memory: Slot<MemoryState>,
    pub timer: Slot<TimerState>,
    pub lcd: Slot<LcdSnapshot>,
    pub link: Slot<LinkState>,
    pub stdint: Slot<StdIntState>,
    pub link_assist: Option<Slot<LinkAssistState>>,
    pub se_aux: Option<Slot<SeAuxState>>,
}

impl MockCalculator {
    /// Stock hardware for `model`, every block at its default
    pub fn new(model: CalcModel) -> Self {
        let profile = HardwareProfile::for_model(model);
        let lcd = if model.has_color_lcd() {
            LcdSnapshot::Color(ColorLcdState::default())
        } else {
            LcdSnapshot::Mono(LcdState::default())
        };

        Self {
            model,
            cpu: Slot::new(CpuState::default()),
            memory: Slot::new(MemoryState::default()),
            timer: Slot::new(TimerState::default()),
            lcd: Slot::new(lcd),
            link: Slot::new(LinkState::default()),
            stdint: Slot::new(StdIntState::default()),
            link_assist: profile
                .link_assist
                .then(|| Slot::new(LinkAssistState::default())),
            se_aux: profile.se_aux.then(|| Slot::new(SeAuxState::default())),
        }
    }

    /// Hardware for `model` loaded with `state`
    pub fn with_state(model: CalcModel, state: &MachineState) -> Self {
        let mut calc = Self::new(model);
        state.apply(&mut calc);
        calc.reset_restored();
        calc
    }

    pub fn reset_restored(&mut self) {
        self.cpu.restored = false;
        self.memory.restored = false;
        self.timer.restored = false;
        self.lcd.restored = false;
        self.link.restored = false;
        self.stdint.restored = false;
        if let Some(la) = self.link_assist.as_mut() {
            la.restored = false;
        }
        if let Some(aux) = self.se_aux.as_mut() {
            aux.restored = false;
        }
    }

    pub fn any_restored(&self) -> bool {
        self.cpu.restored
            || self.memory.restored
            || self.timer.restored
            || self.lcd.restored
            || self.link.restored
            || self.stdint.restored
            || self.link_assist.as_ref().is_some_and(|s| s.restored)
            || self.se_aux.as_ref().is_some_and(|s| s.restored)
    }
}

impl Calculator for MockCalculator {
    fn model(&self) -> CalcModel {
        self.model
    }

    fn cpu(&mut self) -> &mut dyn StateSave<State = CpuState> {
        &mut self.cpu
    }

    fn memory(&mut self) -> &mut dyn StateSave<State = MemoryState> {
        &mut self.memory
    }

    fn timer(&mut self) -> &mut dyn StateSave<State = TimerState> {
        &mut self.timer
    }

    fn lcd(&mut self) -> &mut dyn StateSave<State = LcdSnapshot> {
        &mut self.lcd
    }

    fn link(&mut self) -> &mut dyn StateSave<State = LinkState> {
        &mut self.link
    }

    fn stdint(&mut self) -> &mut dyn StateSave<State = StdIntState> {
        &mut self.stdint
    }

    fn link_assist(&mut self) -> Option<&mut dyn StateSave<State = LinkAssistState>> {
        self.link_assist
            .as_mut()
            .map(|s| s as &mut dyn StateSave<State = LinkAssistState>)
    }

    fn se_aux(&mut self) -> Option<&mut dyn StateSave<State = SeAuxState>> {
        self.se_aux
            .as_mut()
            .map(|s| s as &mut dyn StateSave<State = SeAuxState>)
    }
}

/// A machine state with distinctive values in every block
pub fn sample_state(model: CalcModel) -> MachineState {
    let profile = HardwareProfile::for_model(model);

    let mut cpu = CpuState {
        main: RegisterSet {
            a: 0x11,
            f: 0x22,
            b: 0x33,
            c: 0x44,
            d: 0x55,
            e: 0x66,
            h: 0x77,
            l: 0x88,
        },
        pc: 0x4000,
        sp: 0xFFF0,
        imode: 1,
        iff1: true,
        halt: true,
        model_bits: 1,
        ..CpuState::default()
    };
    cpu.shadow.a = 0x99;
    cpu.pio_interrupts[3] = PioInterrupt {
        interrupt_val: -1,
        skip_factor: 2,
        skip_count: 7,
    };

    let flash: Vec<u8> = (0..2 * PAGE_SIZE).map(|i| (i % 251) as u8).collect();
    let mut memory = MemoryState {
        flash_size: flash.len() as u32,
        ram_size: PAGE_SIZE as u32,
        flash_step: 3,
        boot_mapped: true,
        flash_version: 2,
        flash_upper: 0x7F,
        flash_lower: 0x10,
        flash,
        ram: vec![0xA5; PAGE_SIZE],
        remap: Some(RemapState {
            port27: 5,
            port28: 6,
        }),
        ram_limits: Some(RamLimits {
            upper: 0x8000,
            lower: 0x0100,
        }),
        breakpoints: vec![
            Breakpoint::from_flat(0x4123, BreakKind::Read, false),
            Breakpoint::from_flat(0x0042, BreakKind::Write, true),
        ],
        ..MemoryState::default()
    };
    memory.banks[1] = BankState {
        page: 1,
        read_only: true,
        ram: false,
        no_exec: false,
    };
    memory.timings.write_flash = 4;

    let lcd = if model.has_color_lcd() {
        LcdSnapshot::Color(ColorLcdState {
            active: true,
            x: 10,
            y: 20,
            current_register: 0x22,
            ..ColorLcdState::default()
        })
    } else {
        let mut lcd = LcdState {
            active: true,
            word_len: 8,
            x: 3,
            contrast: 40,
            base_level: 50,
            shades: 6,
            screen_addr: 0xF000,
            ..LcdState::default()
        };
        lcd.display[0] = 0xFF;
        lcd.queue[11][1023] = 0x81;
        LcdSnapshot::Mono(lcd)
    };

    let link_assist = profile.link_assist.then(|| LinkAssistState {
        link_enable: 0x80,
        ready: true,
        last_access: 1.25,
        bit: 3,
        ..LinkAssistState::default()
    });

    let se_aux = profile.se_aux.then(|| SeAuxState {
        clock: ClockState {
            enable: 1,
            set: 1000,
            base: 2000,
            last_time: 3.5,
        },
        delay: [1, 2, 3, 4, 5, 6, 7],
        md5: Md5State {
            regs: [10, 20, 30, 40, 50, 60],
            s: 4,
            mode: 2,
        },
        usb: Some(UsbState {
            line_state: 1,
            dev_address: 9,
            port54: 0x54,
            ..UsbState::default()
        }),
        ..SeAuxState::default()
    });

    MachineState {
        cpu,
        memory,
        timer: TimerState {
            tstates: 123_456_789,
            freq: 6_000_000,
            elapsed: 20.5,
            last_time: 19.0,
        },
        lcd,
        link: LinkState { host: 3 },
        stdint: StdIntState {
            int_active: 0x0B,
            freq: [1.0, 2.0, 3.0, 4.0],
            mem: 0x0C,
            xy: 7,
            ..StdIntState::default()
        },
        link_assist,
        se_aux,
    }
}

/// Full save file bytes for `state`
pub fn save_bytes(model: CalcModel, state: &MachineState) -> Vec<u8> {
    let mut save = SaveState::new(model, "tester", "fixture");
    for chunk in state.encode(model) {
        save.insert_chunk(chunk);
    }
    save.to_bytes().unwrap()
}

/// Copy of `chunk` with its payload edited
pub fn patched(chunk: &Chunk, edit: impl FnOnce(&mut Vec<u8>)) -> Chunk {
    let mut data = chunk.data().unwrap_or(&[]).to_vec();
    edit(&mut data);
    Chunk::new(chunk.tag(), data)
}

/// Save file bytes laid out as an older build would have written them
///
/// Build 1 and earlier carry the MEMC command byte; builds before 2 lack the
/// CPU model bits and the LCD screen address.
pub fn legacy_save_bytes(model: CalcModel, state: &MachineState, build: u32) -> Vec<u8> {
    let mut save = SaveState::new(model, "old", "legacy");

    for chunk in state.encode(model) {
        let chunk = match chunk.tag() {
            ChunkTag::CPU if build < CPU_MODEL_BITS_BUILD => patched(&chunk, |d| {
                d.truncate(d.len() - 4);
            }),
            ChunkTag::LCD if build < LCD_SCREEN_ADDR_BUILD => patched(&chunk, |d| {
                d.truncate(d.len() - 2);
            }),
            ChunkTag::MEM if build <= MEM_C_CMD_BUILD => patched(&chunk, |d| {
                d.insert(20, 0xEE);
            }),
            _ => chunk,
        };
        save.insert_chunk(chunk);
    }

    let mut bytes = save.to_bytes().unwrap();
    bytes[20..24].copy_from_slice(&build.to_le_bytes());
    bytes
}

/// Overwrite the stored minor version of a save file image
pub fn set_minor(bytes: &mut [u8], minor: u32) {
    bytes[16..20].copy_from_slice(&minor.to_le_bytes());
}
