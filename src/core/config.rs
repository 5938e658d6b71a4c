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

//! Tool configuration
//!
//! Read from `ticodec.toml` in the working directory, or from the file named
//! by `TICODEC_CONFIG`. Every field has a default, so a missing file or a
//! partial one is fine.
//!
//! ```toml
//! log_level = "debug"
//!
//! [import]
//! header_only = false
//!
//! [export]
//! author = "me"
//! comment = "Exported by ticodec"
//! ```

use crate::core::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "TICODEC_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "ticodec.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filter handed to the logger unless `RUST_LOG` is set
    pub log_level: String,
    pub import: ImportConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub header_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub author: String,
    pub comment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            import: ImportConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            author: String::new(),
            comment: "Exported by ticodec".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CodecError::Config(e.to_string()))
    }

    /// Load `path`; a missing file yields the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("Loaded configuration from {}", path.display());
                Self::from_toml(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(CodecError::Io(e)),
        }
    }

    /// Path named by `TICODEC_CONFIG`, else `ticodec.toml`
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }
}
