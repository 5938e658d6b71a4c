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

//! Hardware state values carried by a save state
//!
//! The codec knows nothing about hardware semantics beyond field order. Each
//! struct here is a plain value matching the fields one chunk stores, and the
//! hardware models plug in through [`StateSave`] and [`Calculator`].

use crate::core::model::CalcModel;
use serde::{Deserialize, Serialize};

/// Flash/RAM page size in bytes
pub const PAGE_SIZE: usize = 0x4000;

/// Number of PIO interrupt slots stored in the CPU chunk
pub const PIO_INTERRUPT_COUNT: usize = 256;

/// Number of memory banks stored in the MEMC chunk
pub const BANK_COUNT: usize = 5;

/// Monochrome LCD buffer size (128x64 pixels, one bit each)
pub const DISPLAY_SIZE: usize = 128 / 8 * 64;

/// Number of frames kept in the monochrome grayscale queue
pub const LCD_MAX_SHADES: usize = 12;

/// Contrast used when an old save cannot be trusted
pub const LCD_MID_CONTRAST: u32 = 32;

/// Colour LCD geometry
pub const COLOR_LCD_WIDTH: usize = 320;
pub const COLOR_LCD_HEIGHT: usize = 240;
pub const COLOR_LCD_DEPTH: usize = 3;
pub const COLOR_LCD_DISPLAY_SIZE: usize = COLOR_LCD_WIDTH * COLOR_LCD_HEIGHT * COLOR_LCD_DEPTH;

/// Number of controller registers stored for the colour LCD
pub const COLOR_LCD_REGISTER_COUNT: usize = 0xFF;

/// Breakpoint type codes stored in FBRK/RBRK entries
pub const NORMAL_BREAK: u32 = 0x1;
pub const MEM_WRITE_BREAK: u32 = 0x2;
pub const MEM_READ_BREAK: u32 = 0x4;

/// Default screen base address for saves that predate the field
pub const DEFAULT_SCREEN_ADDR: u16 = 0xFC00;

/// One Z80 register bank (main or shadow), in on-disk order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSet {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
}

/// One PIO interrupt slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PioInterrupt {
    pub interrupt_val: i32,
    pub skip_factor: i32,
    pub skip_count: i32,
}

/// CPU state (Z80 core plus PIO interrupt table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuState {
    /// Main registers
    pub main: RegisterSet,

    /// Shadow registers (AF', BC', DE', HL')
    pub shadow: RegisterSet,

    pub ixl: u8,
    pub ixh: u8,
    pub iyl: u8,
    pub iyh: u8,
    pub pc: u16,
    pub sp: u16,
    pub i: u8,
    pub r: u8,

    /// Last value seen on the data bus
    pub bus: u8,

    /// Interrupt mode (0, 1 or 2)
    pub imode: u32,

    pub interrupt: bool,
    pub ei_block: bool,
    pub iff1: bool,
    pub iff2: bool,
    pub halt: bool,
    pub read: bool,
    pub write: bool,
    pub output: bool,
    pub input: bool,

    /// Pending opcode prefix (0, 0xCB, 0xDD, 0xED, 0xFD)
    pub prefix: u32,

    /// PIO interrupt table, `PIO_INTERRUPT_COUNT` entries
    pub pio_interrupts: Vec<PioInterrupt>,

    /// Hardware revision bits reported on port 2
    pub model_bits: u32,
}

impl Default for CpuState {
    fn default() -> Self {
        Self {
            main: RegisterSet::default(),
            shadow: RegisterSet::default(),
            ixl: 0,
            ixh: 0,
            iyl: 0,
            iyh: 0,
            pc: 0,
            sp: 0,
            i: 0,
            r: 0,
            bus: 0,
            imode: 0,
            interrupt: false,
            ei_block: false,
            iff1: false,
            iff2: false,
            halt: false,
            read: false,
            write: false,
            output: false,
            input: false,
            prefix: 0,
            pio_interrupts: vec![PioInterrupt::default(); PIO_INTERRUPT_COUNT],
            model_bits: 0,
        }
    }
}

/// One of the five memory bank descriptors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankState {
    pub page: u32,
    pub read_only: bool,
    pub ram: bool,
    pub no_exec: bool,
}

impl BankState {
    /// Byte offset of the bank's page in its backing memory
    pub fn addr(&self) -> usize {
        self.page as usize * PAGE_SIZE
    }
}

/// Memory access costs in T-states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTimings {
    pub read_op_flash: i32,
    pub read_nop_flash: i32,
    pub write_flash: i32,
    pub read_op_ram: i32,
    pub read_nop_ram: i32,
    pub write_ram: i32,
}

/// Port 27/28 remap counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapState {
    pub port27: u32,
    pub port28: u32,
}

/// Execution limits on RAM
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamLimits {
    pub upper: u32,
    pub lower: u32,
}

/// Breakpoint flavour selected by the stored type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    Normal,
    Read,
    Write,
}

impl BreakKind {
    /// Map a stored type code; unknown codes become plain breakpoints
    pub fn from_type(code: u32) -> Self {
        match code {
            MEM_READ_BREAK => BreakKind::Read,
            MEM_WRITE_BREAK => BreakKind::Write,
            _ => BreakKind::Normal,
        }
    }

    pub fn type_code(self) -> u32 {
        match self {
            BreakKind::Normal => NORMAL_BREAK,
            BreakKind::Read => MEM_READ_BREAK,
            BreakKind::Write => MEM_WRITE_BREAK,
        }
    }
}

/// A breakpoint restored onto the memory context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub kind: BreakKind,
    pub page: u32,
    pub offset: u16,
    pub is_ram: bool,
}

impl Breakpoint {
    /// Split a flat address into page and offset
    pub fn from_flat(addr: u32, kind: BreakKind, is_ram: bool) -> Self {
        Self {
            kind,
            page: addr / PAGE_SIZE as u32,
            offset: (addr % PAGE_SIZE as u32) as u16,
            is_ram,
        }
    }

    pub fn flat_addr(&self) -> u32 {
        self.page * PAGE_SIZE as u32 + u32::from(self.offset)
    }
}

/// Memory context state (MEMC, ROM, RAM and the optional memory chunks)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub flash_size: u32,
    pub ram_size: u32,

    /// Flash command state machine step
    pub flash_step: u32,

    pub boot_mapped: bool,
    pub flash_locked: bool,
    pub flash_version: u32,
    pub banks: [BankState; BANK_COUNT],
    pub timings: MemoryTimings,
    pub flash_upper: u32,
    pub flash_lower: u32,

    /// Flash contents (`flash_size` bytes)
    #[serde(skip)]
    pub flash: Vec<u8>,

    /// RAM contents (`ram_size` bytes)
    #[serde(skip)]
    pub ram: Vec<u8>,

    pub remap: Option<RemapState>,
    pub ram_limits: Option<RamLimits>,
    pub breakpoints: Vec<Breakpoint>,
}

/// Timer context state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub tstates: u64,
    pub freq: u64,
    pub elapsed: f64,
    pub last_time: f64,
}

/// Frame timing values shared by both LCD variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LcdTiming {
    pub time: f64,
    pub ufps: f64,
    pub ufps_last: f64,
    pub last_gif_frame: f64,
    pub write_avg: f64,
    pub write_last: f64,
}

/// Monochrome T6A04-style LCD state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LcdState {
    pub active: bool,
    pub word_len: u32,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub cursor_mode: u32,
    pub contrast: u32,
    pub base_level: u32,

    /// Display RAM, `DISPLAY_SIZE` bytes
    #[serde(skip)]
    pub display: Vec<u8>,

    pub front: u32,

    /// Grayscale frame queue, `LCD_MAX_SHADES` rows of `DISPLAY_SIZE` bytes
    #[serde(skip)]
    pub queue: Vec<Vec<u8>>,

    pub shades: u32,
    pub mode: u32,
    pub timing: LcdTiming,
    pub screen_addr: u16,
}

impl Default for LcdState {
    fn default() -> Self {
        Self {
            active: false,
            word_len: 0,
            x: 0,
            y: 0,
            z: 0,
            cursor_mode: 0,
            contrast: 0,
            base_level: 0,
            display: vec![0; DISPLAY_SIZE],
            front: 0,
            queue: vec![vec![0; DISPLAY_SIZE]; LCD_MAX_SHADES],
            shades: 0,
            mode: 0,
            timing: LcdTiming::default(),
            screen_addr: DEFAULT_SCREEN_ADDR,
        }
    }
}

impl LcdState {
    /// Base contrast level a model's LCD starts from
    pub fn model_base_level(model: CalcModel) -> u32 {
        match model {
            CalcModel::Ti81 | CalcModel::Ti82 | CalcModel::Ti83 => 36,
            CalcModel::Ti85 | CalcModel::Ti86 => 26,
            _ => 48,
        }
    }
}

/// 320x240 colour LCD state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorLcdState {
    pub active: bool,
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub cursor_mode: u32,
    pub contrast: u32,
    pub timing: LcdTiming,

    #[serde(skip)]
    pub display: Vec<u8>,

    #[serde(skip)]
    pub queued_image: Vec<u8>,

    pub registers: Vec<u8>,
    pub current_register: u32,
    pub read_buffer: u32,
    pub write_buffer: u32,
    pub read_step: u32,
    pub write_step: u32,
    pub frame_rate: u32,
    pub front: u32,
}

impl Default for ColorLcdState {
    fn default() -> Self {
        Self {
            active: false,
            x: 0,
            y: 0,
            z: 0,
            cursor_mode: 0,
            contrast: 0,
            timing: LcdTiming::default(),
            display: vec![0; COLOR_LCD_DISPLAY_SIZE],
            queued_image: vec![0; COLOR_LCD_DISPLAY_SIZE],
            registers: vec![0; COLOR_LCD_REGISTER_COUNT],
            current_register: 0,
            read_buffer: 0,
            write_buffer: 0,
            read_step: 0,
            write_step: 0,
            frame_rate: 0,
            front: 0,
        }
    }
}

/// Either LCD variant, selected by the target model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LcdSnapshot {
    Mono(LcdState),
    Color(ColorLcdState),
}

/// Link port state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkState {
    pub host: u8,
}

/// Standard interrupt controller state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StdIntState {
    pub int_active: u8,
    pub lastchk1: f64,
    pub timermax1: f64,
    pub lastchk2: f64,
    pub timermax2: f64,
    pub freq: [f64; 4],
    pub mem: u32,
    pub xy: u32,
}

/// Hardware link assist (83+ family)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkAssistState {
    pub link_enable: u8,
    pub input: u8,
    pub output: u8,
    pub working: u8,
    pub receiving: bool,
    pub read: bool,
    pub ready: bool,
    pub error: bool,
    pub sending: bool,
    pub last_access: f64,
    pub bit: u32,
}

/// Real-time clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    pub enable: u8,
    pub set: u32,
    pub base: u32,
    pub last_time: f64,
}

/// MD5 coprocessor registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Md5State {
    pub regs: [u32; 6],
    pub s: u8,
    pub mode: u8,
}

/// One crystal timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct XtalTimer {
    pub last_tstates: u64,
    pub last_ticks: f64,
    pub divisor: f64,
    pub looping: bool,
    pub interrupt: bool,
    pub underflow: bool,
    pub generate: bool,
    pub active: bool,
    pub clock: u8,
    pub count: u8,
    pub max: u8,
}

/// Crystal timer block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct XtalState {
    pub last_time: f64,
    pub ticks: u64,
    pub timers: [XtalTimer; 3],
}

/// USB controller registers (84+ family)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbState {
    pub line_state: u32,
    pub events: u32,
    pub event_mask: u32,
    pub line_interrupt: bool,
    pub protocol_interrupt: bool,
    pub protocol_interrupt_enabled: bool,
    pub dev_address: u32,
    pub port4a: u8,
    pub port4c: u8,
    pub port54: u8,
}

/// SE auxiliary hardware: clock, delays, MD5, link assist, crystal timers, USB
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeAuxState {
    pub clock: ClockState,
    pub delay: [u8; 7],
    pub md5: Md5State,
    pub link_assist: LinkAssistState,
    pub xtal: XtalState,
    pub usb: Option<UsbState>,
}

/// Which optional hardware blocks a target calculator carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareProfile {
    pub model: CalcModel,
    pub link_assist: bool,
    pub se_aux: bool,
}

impl HardwareProfile {
    /// Stock hardware for a model
    pub fn for_model(model: CalcModel) -> Self {
        Self {
            model,
            link_assist: matches!(model, CalcModel::Ti73 | CalcModel::Ti83P),
            se_aux: model >= CalcModel::Ti83PSE,
        }
    }
}

/// Complete decoded machine state
///
/// A save state decodes into this value first; hardware is only touched once
/// every chunk has been read successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    pub cpu: CpuState,
    pub memory: MemoryState,
    pub timer: TimerState,
    pub lcd: LcdSnapshot,
    pub link: LinkState,
    pub stdint: StdIntState,
    pub link_assist: Option<LinkAssistState>,
    pub se_aux: Option<SeAuxState>,
}

impl MachineState {
    /// Restore every component of `calc` from this state
    pub fn apply(&self, calc: &mut dyn Calculator) {
        calc.cpu().restore_from_state(&self.cpu);
        calc.memory().restore_from_state(&self.memory);
        calc.timer().restore_from_state(&self.timer);
        calc.lcd().restore_from_state(&self.lcd);
        calc.link().restore_from_state(&self.link);
        calc.stdint().restore_from_state(&self.stdint);

        if let (Some(state), Some(target)) = (&self.link_assist, calc.link_assist()) {
            target.restore_from_state(state);
        }
        if let (Some(state), Some(target)) = (&self.se_aux, calc.se_aux()) {
            target.restore_from_state(state);
        }
    }

    /// Snapshot every component of `calc`
    pub fn capture(calc: &mut dyn Calculator) -> Self {
        Self {
            cpu: calc.cpu().to_state(),
            memory: calc.memory().to_state(),
            timer: calc.timer().to_state(),
            lcd: calc.lcd().to_state(),
            link: calc.link().to_state(),
            stdint: calc.stdint().to_state(),
            link_assist: calc.link_assist().map(|la| la.to_state()),
            se_aux: calc.se_aux().map(|aux| aux.to_state()),
        }
    }
}

/// Trait for components that can be saved and restored
///
/// Hardware models implement this for each block a save state carries.
///
/// # Example
///
/// ```
/// use ticodec::core::save_state::{LinkState, StateSave};
///
/// struct LinkPort {
///     host: u8,
/// }
///
/// impl StateSave for LinkPort {
///     type State = LinkState;
///
///     fn to_state(&self) -> LinkState {
///         LinkState { host: self.host }
///     }
///
///     fn restore_from_state(&mut self, state: &LinkState) {
///         self.host = state.host;
///     }
/// }
/// ```
pub trait StateSave {
    /// The state type for this component
    type State: serde::Serialize + for<'de> serde::Deserialize<'de>;

    /// Convert this component to a saveable state
    fn to_state(&self) -> Self::State;

    /// Restore this component from a saved state
    fn restore_from_state(&mut self, state: &Self::State);
}

/// Narrow view of an emulated calculator used by save-state load and capture
pub trait Calculator {
    fn model(&self) -> CalcModel;
    fn cpu(&mut self) -> &mut dyn StateSave<State = CpuState>;
    fn memory(&mut self) -> &mut dyn StateSave<State = MemoryState>;
    fn timer(&mut self) -> &mut dyn StateSave<State = TimerState>;
    fn lcd(&mut self) -> &mut dyn StateSave<State = LcdSnapshot>;
    fn link(&mut self) -> &mut dyn StateSave<State = LinkState>;
    fn stdint(&mut self) -> &mut dyn StateSave<State = StdIntState>;

    fn link_assist(&mut self) -> Option<&mut dyn StateSave<State = LinkAssistState>> {
        None
    }

    fn se_aux(&mut self) -> Option<&mut dyn StateSave<State = SeAuxState>> {
        None
    }

    /// Optional blocks present on this calculator
    fn profile(&mut self) -> HardwareProfile {
        HardwareProfile {
            model: self.model(),
            link_assist: self.link_assist().is_some(),
            se_aux: self.se_aux().is_some(),
        }
    }
}
