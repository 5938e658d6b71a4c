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

//! Load and capture against a calculator

use super::super::*;
use super::helpers::*;

#[test]
fn test_capture_then_load() {
    let model = CalcModel::Ti84PSE;
    let state = sample_state(model);
    let mut source = MockCalculator::with_state(model, &state);

    let save = SaveState::capture(&mut source, "me", "snapshot");
    assert_eq!(save.model(), model);
    assert_eq!(save.author(), "me");

    let bytes = save.to_bytes().unwrap();
    let mut loaded = SaveState::read(&bytes).unwrap();

    let mut target = MockCalculator::new(model);
    loaded.load_slot(&mut target).unwrap();

    assert!(target.cpu.restored);
    assert_eq!(target.cpu.state, state.cpu);
    assert_eq!(target.memory.state, state.memory);
    assert_eq!(target.lcd.state, state.lcd);
    assert_eq!(target.se_aux.as_ref().unwrap().state, state.se_aux.unwrap());
}

#[test]
fn test_failed_load_leaves_calculator_untouched() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);

    // Everything but the STDI chunk, which is decoded last among the required ones
    let mut save = SaveState::new(model, "", "");
    for chunk in state.encode(model) {
        if chunk.tag() != ChunkTag::STDINT {
            save.insert_chunk(chunk);
        }
    }
    let mut loaded = SaveState::read(&save.to_bytes().unwrap()).unwrap();

    let mut target = MockCalculator::new(model);
    let err = loaded.load_slot(&mut target).unwrap_err();

    assert!(matches!(err, CodecError::MissingChunk(_)));
    assert!(!target.any_restored());
    assert_eq!(target.cpu.state, CpuState::default());
}

#[test]
fn test_load_is_repeatable() {
    let model = CalcModel::Ti86;
    let state = sample_state(model);
    let mut loaded = SaveState::read(&save_bytes(model, &state)).unwrap();

    let mut first = MockCalculator::new(model);
    let mut second = MockCalculator::new(model);
    loaded.load_slot(&mut first).unwrap();
    loaded.load_slot(&mut second).unwrap();

    assert_eq!(first.cpu.state, second.cpu.state);
    assert_eq!(first.timer.state, state.timer);
    assert_eq!(second.link.state.host, 3);
}

#[test]
fn test_profile_follows_optional_blocks() {
    let mut calc = MockCalculator::new(CalcModel::Ti83P);
    assert_eq!(calc.profile(), HardwareProfile::for_model(CalcModel::Ti83P));

    calc.link_assist = None;
    assert!(!calc.profile().link_assist);
}

#[test]
fn test_link_assist_restored_on_83p() {
    let model = CalcModel::Ti83P;
    let state = sample_state(model);
    let mut loaded = SaveState::read(&save_bytes(model, &state)).unwrap();

    let mut target = MockCalculator::new(model);
    loaded.load_slot(&mut target).unwrap();

    let la = target.link_assist.as_ref().unwrap();
    assert!(la.restored);
    assert_eq!(la.state, state.link_assist.unwrap());
}

#[test]
fn test_machine_state_serializes() {
    let state = sample_state(CalcModel::Ti83);
    let json = serde_json::to_string(&state.timer).unwrap();
    let back: TimerState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state.timer);
}
