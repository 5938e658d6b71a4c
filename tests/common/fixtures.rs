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

//! Test fixtures for common test scenarios

use std::path::PathBuf;
use tempfile::TempDir;
use ticodec::core::save_state::*;
use ticodec::core::CalcModel;

/// Hardware block that keeps whatever state it is handed
pub struct Block<T> {
    pub state: T,
}

impl<T> StateSave for Block<T>
where
    T: Clone + serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type State = T;

    fn to_state(&self) -> T {
        self.state.clone()
    }

    fn restore_from_state(&mut self, state: &T) {
        self.state = state.clone();
    }
}

fn block<T>(state: T) -> Block<T> {
    Block { state }
}

/// Minimal calculator with one flash page and one RAM page
pub struct TestCalculator {
    pub model: CalcModel,
    pub cpu: Block<CpuState>,
    pub memory: Block<MemoryState>,
    pub timer: Block<TimerState>,
    pub lcd: Block<LcdSnapshot>,
    pub link: Block<LinkState>,
    pub stdint: Block<StdIntState>,
    pub link_assist: Option<Block<LinkAssistState>>,
    pub se_aux: Option<Block<SeAuxState>>,
}

impl TestCalculator {
    pub fn new(model: CalcModel) -> Self {
        let profile = HardwareProfile::for_model(model);
        let lcd = if model.has_color_lcd() {
            LcdSnapshot::Color(ColorLcdState::default())
        } else {
            LcdSnapshot::Mono(LcdState::default())
        };
        let memory = MemoryState {
            flash_size: PAGE_SIZE as u32,
            ram_size: PAGE_SIZE as u32,
            flash: vec![0xFF; PAGE_SIZE],
            ram: vec![0x00; PAGE_SIZE],
            ..MemoryState::default()
        };

        Self {
            model,
            cpu: block(CpuState::default()),
            memory: block(memory),
            timer: block(TimerState::default()),
            lcd: block(lcd),
            link: block(LinkState::default()),
            stdint: block(StdIntState::default()),
            link_assist: profile
                .link_assist
                .then(|| block(LinkAssistState::default())),
            se_aux: profile.se_aux.then(|| block(SeAuxState::default())),
        }
    }

    /// Same hardware with a recognisable program counter and flash pattern
    pub fn running(model: CalcModel) -> Self {
        let mut calc = Self::new(model);
        calc.cpu.state.pc = 0x1234;
        calc.cpu.state.sp = 0xFFEE;
        for (i, byte) in calc.memory.state.flash.iter_mut().enumerate() {
            *byte = (i % 241) as u8;
        }
        calc.timer.state.tstates = 42_000;
        calc.link.state.host = 1;
        calc
    }
}

impl Calculator for TestCalculator {
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
            .map(|b| b as &mut dyn StateSave<State = LinkAssistState>)
    }

    fn se_aux(&mut self) -> Option<&mut dyn StateSave<State = SeAuxState>> {
        self.se_aux
            .as_mut()
            .map(|b| b as &mut dyn StateSave<State = SeAuxState>)
    }
}

/// Scratch directory that lives as long as the returned guard
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write `bytes` to `name` inside `dir`
pub fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("Failed to write fixture");
    path
}
