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

//! Custom assertions for codec testing

use ticodec::core::tifile::{TiFlash, TiVar};

/// Assert two flash images hold the same pages with the same used sizes
pub fn assert_flash_pages_eq(actual: &TiFlash, expected: &TiFlash) {
    let actual_pages: Vec<_> = actual.pages().map(|(i, _, size)| (i, size)).collect();
    let expected_pages: Vec<_> = expected.pages().map(|(i, _, size)| (i, size)).collect();
    assert_eq!(actual_pages, expected_pages, "Flash page layout mismatch");

    for (index, data, size) in expected.pages() {
        let got = actual.page(index).expect("page missing");
        assert_eq!(
            &got[..size],
            &data[..size],
            "Flash page {} contents mismatch",
            index
        );
    }
}

/// Assert a variable survived export and import
pub fn assert_var_eq(actual: &TiVar, expected: &TiVar) {
    assert_eq!(actual.name_str(), expected.name_str(), "Variable name mismatch");
    assert_eq!(
        actual.var_type, expected.var_type,
        "Variable '{}' type mismatch: expected 0x{:02X}, got 0x{:02X}",
        expected.name_str(),
        expected.var_type,
        actual.var_type
    );
    assert_eq!(
        actual.data,
        expected.data,
        "Variable '{}' data mismatch",
        expected.name_str()
    );
}
