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

//! Var and group file writer

use super::var::{TiVar, VAR_NAME_LENGTH};
use super::{var_signature, TiFile, COMMENT_LENGTH};
use crate::core::error::{CodecError, Result};
use crate::core::io::WriteLeExt;
use crate::core::model::CalcModel;
use std::io::Write;

const SUBSIGNATURE: [u8; 3] = [0x1A, 0x0A, 0x00];

/// Low 16 bits of the byte sum, as stored after the var section
pub fn var_checksum(section: &[u8]) -> u16 {
    section
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

fn encode_entry(out: &mut Vec<u8>, var: &TiVar, model: CalcModel) -> Result<()> {
    let length = var.data.len() as u16;
    let name_bytes = match model {
        CalcModel::Ti85 => usize::from(var.name_length).min(VAR_NAME_LENGTH),
        _ => VAR_NAME_LENGTH,
    };
    let has_name_length = matches!(model, CalcModel::Ti85 | CalcModel::Ti86);
    let has_version = model >= CalcModel::Ti83P;

    let header_size =
        2 + 1 + usize::from(has_name_length) + name_bytes + if has_version { 2 } else { 0 };

    out.write_u16_le(header_size as u16)?;
    out.write_u16_le(length)?;
    out.write_u8(var.var_type)?;
    if has_name_length {
        out.write_u8(var.name_length)?;
    }
    out.write_all(&var.name[..name_bytes])?;
    if has_version {
        out.write_u8(var.version)?;
        out.write_u8(var.flag.bits())?;
    }
    out.write_u16_le(length)?;
    out.write_all(&var.data)?;
    Ok(())
}

impl TiFile {
    /// Write `vars` as a var file, or a group file when there are several
    pub fn export_vars<W: Write>(
        mut out: W,
        model: CalcModel,
        vars: &[TiVar],
        comment: &str,
    ) -> Result<()> {
        let signature = var_signature(model).ok_or_else(|| {
            CodecError::UnsupportedFormat(format!("{} has no variable file format", model))
        })?;
        if vars.is_empty() {
            return Err(CodecError::FormatUnrecognized(
                "no variables to export".to_string(),
            ));
        }
        if vars.len() > super::MAX_GROUP_VARS {
            return Err(CodecError::TooManyVariables {
                limit: super::MAX_GROUP_VARS,
            });
        }

        let mut section = Vec::new();
        for var in vars {
            encode_entry(&mut section, var, model)?;
        }
        let section_length = u16::try_from(section.len()).map_err(|_| {
            CodecError::UnsupportedFormat(format!(
                "variable data of {} bytes does not fit a var file",
                section.len()
            ))
        })?;

        out.write_all(signature)?;
        out.write_all(&SUBSIGNATURE)?;
        out.write_padded(comment.as_bytes(), COMMENT_LENGTH)?;
        out.write_u16_le(section_length)?;
        out.write_all(&section)?;
        out.write_u16_le(var_checksum(&section))?;

        log::debug!(
            "Exported {} variables ({} bytes) for {}",
            vars.len(),
            section.len(),
            model
        );
        Ok(())
    }
}
