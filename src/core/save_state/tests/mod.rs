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

//! Save state test modules
//!
//! Tests are organized into the following categories:
//! - `helpers`: mock calculator and fixture builders
//! - `catalog`: header parsing, chunk table, writer
//! - `decode`: per-block decoding and version gates
//! - `slot`: load/capture against a calculator

#[cfg(test)]
mod helpers;


#[cfg(test)]
mod decode;

#[cfg(test)]
mod slot;
