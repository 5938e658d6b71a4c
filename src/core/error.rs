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

/// Codec error types
use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Main error type for the codec layer
///
/// Every fatal condition aborts the current import or load. `LengthMismatch`
/// is the one variant that is only ever logged and collected as a warning.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unrecognized file format: {0}")]
    FormatUnrecognized(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Incompatible save state version {found} (expected major {expected})")]
    IncompatibleVersion { expected: u32, found: u32 },

    #[error("Chunk '{tag}' overrun: cursor {cursor} exceeds size {size}")]
    ChunkOverrun {
        tag: String,
        cursor: usize,
        size: usize,
    },

    #[error("Missing required chunk '{0}'")]
    MissingChunk(String),

    #[error("Truncated input: {0}")]
    TruncatedInput(String),

    #[error("Intel HEX parse error on line {line}: {reason}")]
    HexParse { line: usize, reason: String },

    #[error("Model detection failed: {0}")]
    ModelDetection(String),

    #[error("{what} length mismatch: primary {primary}, copy {copy}")]
    LengthMismatch {
        what: &'static str,
        primary: u16,
        copy: u16,
    },

    #[error("Too many variables in group file (limit {limit})")]
    TooManyVariables { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl CodecError {
    /// True for conditions that are reported but never abort an import
    pub fn is_warning(&self) -> bool {
        matches!(self, CodecError::LengthMismatch { .. })
    }
}
