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

//! Codec components
//!
//! This module contains the readers and writers:
//! - Chunk cursor and writer
//! - Save state container and hardware block codecs
//! - Intel HEX records
//! - TI file importer (ROM, flash, var, group, backup)
//! - ROM model detection

pub mod chunk;
pub mod config;
pub mod error;
pub mod intel_hex;
pub mod io;
pub mod model;
pub mod rom;
pub mod save_state;
pub mod tifile;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkTag, ChunkWriter};
pub use config::Config;
pub use error::{CodecError, Result};
pub use intel_hex::{IntelHexReader, IntelHexRecord, IntelHexWriter};
pub use model::CalcModel;
pub use rom::RomInfo;
pub use save_state::{Calculator, MachineState, SaveState, StateSave};
pub use tifile::{TiFile, TiFileImporter, TiFilePayload, TiFileType};
