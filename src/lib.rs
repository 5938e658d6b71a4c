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

//! Codecs for TI Z80 calculator emulator files
//!
//! This library reads and writes the files an emulator for the TI-73 .. TI-86
//! and TI-83 Plus family deals with: save states, ROM dumps, flash OS and
//! application images, variable and group files, and memory backups.
//!
//! # Example
//!
//! ```
//! use ticodec::core::{CalcModel, SaveState, TiFileImporter, TiFileType};
//!
//! let bytes = SaveState::new(CalcModel::Ti83P, "me", "empty").to_bytes().unwrap();
//! let file = TiFileImporter::new().import_bytes(&bytes).unwrap();
//!
//! assert_eq!(file.file_type(), TiFileType::Sav);
//! assert_eq!(file.model(), Some(CalcModel::Ti83P));
//! ```

pub mod core;
