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

//! TI file importer
//!
//! Classifies a file by its first eight bytes and hands it to the matching
//! reader:
//!
//! | Signature                  | Kind          |
//! |----------------------------|---------------|
//! | `*WABBIT*` / `*WABCMP*`    | save state    |
//! | `**TIFL**`                 | flash image   |
//! | `**TI73**` .. `**TI86**`   | var / group   |
//! | anything else              | raw ROM dump  |
//!
//! Label (`.lab`) and breakpoint (`.brk`) files are recognised by extension
//! alone.

mod backup;
mod export;
mod flash;
mod var;

pub use backup::TiBackup;
pub use export::var_checksum;
pub use flash::{
    FlashHeader, TiFlash, DEVICE_TI73, DEVICE_TI83P, FLASH_PAGE_COUNT, FLASH_PAGE_SIZE,
    FLASH_SIGNATURE, FLASH_TYPE_APP, FLASH_TYPE_OS, TI_FLASH_HEADER_SIZE,
};
pub use var::{
    is_backup_type, GroupAccumulator, TiVar, VarFlags, GROUP_ENTRY_OVERHEAD, MAX_GROUP_VARS,
    VAR_NAME_LENGTH,
};

use crate::core::error::{CodecError, Result};
use crate::core::intel_hex::IntelHexReader;
use crate::core::io::{padded_text, ReadLeExt};
use crate::core::model::CalcModel;
use crate::core::rom::{self, RomInfo};
use crate::core::save_state::SaveState;
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use var::{import_var_section, VarSection};

/// Size of the header in front of the var section
pub const TI_FILE_HEADER_SIZE: usize = 53;

const SIGNATURE_LENGTH: usize = 8;
const COMMENT_LENGTH: usize = 42;

/// Var signatures and the model each one implies
pub const VAR_SIGNATURES: [(&[u8; 8], CalcModel); 6] = [
    (b"**TI73**", CalcModel::Ti73),
    (b"**TI82**", CalcModel::Ti82),
    (b"**TI83**", CalcModel::Ti83),
    (b"**TI83F*", CalcModel::Ti83P),
    (b"**TI85**", CalcModel::Ti85),
    (b"**TI86**", CalcModel::Ti86),
];

/// What a file turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TiFileType {
    Rom,
    Flash,
    Var,
    Sav,
    Backup,
    Label,
    Breakpoint,
    Group,
}

/// The 53-byte header of a var file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarHeader {
    pub signature: [u8; SIGNATURE_LENGTH],
    pub subsignature: [u8; 3],
    pub comment: [u8; COMMENT_LENGTH],
}

impl VarHeader {
    fn parse(raw: &[u8; TI_FILE_HEADER_SIZE]) -> Self {
        let mut signature = [0u8; SIGNATURE_LENGTH];
        signature.copy_from_slice(&raw[..SIGNATURE_LENGTH]);
        let mut subsignature = [0u8; 3];
        subsignature.copy_from_slice(&raw[8..11]);
        let mut comment = [0u8; COMMENT_LENGTH];
        comment.copy_from_slice(&raw[11..]);
        Self {
            signature,
            subsignature,
            comment,
        }
    }

    pub fn comment_str(&self) -> String {
        padded_text(&self.comment)
    }
}

/// A raw ROM image and what the detector made of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiRom {
    pub data: Vec<u8>,
    pub info: RomInfo,
}

/// Decoded contents, one variant per file kind
#[derive(Debug)]
pub enum TiFilePayload {
    None,
    Rom(TiRom),
    Flash(TiFlash),
    Save(SaveState),
    Vars(Vec<TiVar>),
    Backup(TiBackup),
}

/// An imported file
#[derive(Debug)]
pub struct TiFile {
    file_type: TiFileType,
    model: Option<CalcModel>,
    header: Option<VarHeader>,
    payload: TiFilePayload,
    checksum: Option<u16>,
    warnings: Vec<CodecError>,
}

impl TiFile {
    fn new(file_type: TiFileType) -> Self {
        Self {
            file_type,
            model: None,
            header: None,
            payload: TiFilePayload::None,
            checksum: None,
            warnings: Vec::new(),
        }
    }

    pub fn file_type(&self) -> TiFileType {
        self.file_type
    }

    pub fn model(&self) -> Option<CalcModel> {
        self.model
    }

    pub fn var_header(&self) -> Option<&VarHeader> {
        self.header.as_ref()
    }

    pub fn payload(&self) -> &TiFilePayload {
        &self.payload
    }

    /// Checksum stored at the end of a var file, never verified
    pub fn checksum(&self) -> Option<u16> {
        self.checksum
    }

    /// Non-fatal problems found while reading
    pub fn warnings(&self) -> &[CodecError] {
        &self.warnings
    }

    pub fn rom(&self) -> Option<&TiRom> {
        match &self.payload {
            TiFilePayload::Rom(rom) => Some(rom),
            _ => None,
        }
    }

    pub fn flash(&self) -> Option<&TiFlash> {
        match &self.payload {
            TiFilePayload::Flash(flash) => Some(flash),
            _ => None,
        }
    }

    pub fn save(&self) -> Option<&SaveState> {
        match &self.payload {
            TiFilePayload::Save(save) => Some(save),
            _ => None,
        }
    }

    pub fn save_mut(&mut self) -> Option<&mut SaveState> {
        match &mut self.payload {
            TiFilePayload::Save(save) => Some(save),
            _ => None,
        }
    }

    pub fn vars(&self) -> &[TiVar] {
        match &self.payload {
            TiFilePayload::Vars(vars) => vars,
            _ => &[],
        }
    }

    pub fn backup(&self) -> Option<&TiBackup> {
        match &self.payload {
            TiFilePayload::Backup(backup) => Some(backup),
            _ => None,
        }
    }

    /// Drop every buffer the file owns
    pub fn release(&mut self) {
        if let TiFilePayload::Save(save) = &mut self.payload {
            save.free_save();
        }
        self.payload = TiFilePayload::None;
    }

    /// Serializable overview used by the command line front end
    pub fn summary(&self) -> FileSummary {
        let mut summary = FileSummary {
            file_type: self.file_type,
            model: self.model.map(|m| m.name().to_string()),
            comment: self.header.as_ref().map(VarHeader::comment_str),
            rom_version: None,
            flash_name: None,
            flash_date: None,
            flash_pages: None,
            save_version: None,
            save_author: None,
            chunks: Vec::new(),
            vars: Vec::new(),
            checksum: self.checksum,
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
        };

        match &self.payload {
            TiFilePayload::Rom(rom) => summary.rom_version = Some(rom.info.version.clone()),
            TiFilePayload::Flash(flash) => {
                summary.flash_name = Some(flash.header().name_str());
                summary.flash_date = flash.header().date().map(|d| d.to_string());
                summary.flash_pages = Some(flash.total_pages());
            }
            TiFilePayload::Save(save) => {
                let (major, minor, build) = save.version();
                summary.save_version = Some(format!("{}.{}.{}", major, minor, build));
                summary.save_author = Some(save.author().to_string());
                summary.chunks = save.chunks().tags().iter().map(|t| t.to_string()).collect();
            }
            TiFilePayload::Vars(vars) => {
                summary.vars = vars
                    .iter()
                    .map(|v| VarSummary {
                        name: v.name_str(),
                        var_type: v.var_type,
                        length: v.length,
                        archived: v.is_archived(),
                    })
                    .collect();
            }
            TiFilePayload::Backup(_) | TiFilePayload::None => {}
        }

        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VarSummary {
    pub name: String,
    pub var_type: u8,
    pub length: u16,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub file_type: TiFileType,
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rom_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_author: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<VarSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Classify a file from its leading bytes
///
/// Short inputs that cannot hold a signature are treated as ROM dumps and
/// left for the detector to reject.
pub fn sniff(bytes: &[u8]) -> (TiFileType, Option<CalcModel>) {
    let Some(sig) = bytes.get(..SIGNATURE_LENGTH) else {
        return (TiFileType::Rom, None);
    };

    if SaveState::sniff(bytes) {
        return (TiFileType::Sav, None);
    }
    if sig.eq_ignore_ascii_case(FLASH_SIGNATURE) {
        return (TiFileType::Flash, None);
    }
    for (signature, model) in VAR_SIGNATURES {
        if sig.eq_ignore_ascii_case(signature) {
            return (TiFileType::Var, Some(model));
        }
    }
    (TiFileType::Rom, None)
}

/// Var signature written for a model, if it has a var format
pub fn var_signature(model: CalcModel) -> Option<&'static [u8; 8]> {
    let family = match model {
        CalcModel::Ti83PSE | CalcModel::Ti84P | CalcModel::Ti84PSE | CalcModel::Ti84PCSE => {
            CalcModel::Ti83P
        }
        other => other,
    };
    VAR_SIGNATURES
        .iter()
        .find(|(_, m)| *m == family)
        .map(|(sig, _)| *sig)
}

fn extension_type(path: &Path) -> Option<TiFileType> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("lab") {
        Some(TiFileType::Label)
    } else if ext.eq_ignore_ascii_case("brk") {
        Some(TiFileType::Breakpoint)
    } else {
        None
    }
}

/// Reads ROM, flash, var, backup and save-state files
#[derive(Debug, Clone, Copy, Default)]
pub struct TiFileImporter {
    header_only: bool,
}

impl TiFileImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after the header for every kind except ROM and save states
    pub fn header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    pub fn import_path<P: AsRef<Path>>(&self, path: P) -> Result<TiFile> {
        let path = path.as_ref();
        if let Some(file_type) = extension_type(path) {
            log::debug!("{} recognised as {:?} by extension", path.display(), file_type);
            return Ok(TiFile::new(file_type));
        }

        log::info!("Importing {}", path.display());
        let bytes = fs::read(path)?;
        self.import_bytes(&bytes)
    }

    pub fn import_bytes(&self, bytes: &[u8]) -> Result<TiFile> {
        let (file_type, model) = sniff(bytes);
        let mut file = TiFile::new(file_type);
        file.model = model;

        match file_type {
            TiFileType::Sav => {
                let save = SaveState::read(bytes)?;
                file.model = Some(save.model());
                file.payload = TiFilePayload::Save(save);
            }
            TiFileType::Rom => {
                let info = rom::detect(bytes)?;
                file.model = Some(info.model);
                file.payload = TiFilePayload::Rom(TiRom {
                    data: bytes.to_vec(),
                    info,
                });
            }
            TiFileType::Flash => self.import_flash(bytes, &mut file)?,
            _ => self.import_var(bytes, &mut file)?,
        }

        Ok(file)
    }

    fn import_flash(&self, bytes: &[u8], file: &mut TiFile) -> Result<()> {
        let mut cursor = Cursor::new(bytes);
        let raw: [u8; TI_FLASH_HEADER_SIZE] = cursor.read_array("flash header")?;
        let mut flash = TiFlash::new(FlashHeader::parse(&raw));

        if !self.header_only {
            let mut reader = IntelHexReader::new(cursor);
            flash.import_hex(&mut reader)?;
        }

        match flash.header().model() {
            Ok(model) => file.model = Some(model),
            Err(e) if self.header_only => log::debug!("{}", e),
            Err(e) => return Err(e),
        }
        file.payload = TiFilePayload::Flash(flash);
        Ok(())
    }

    fn import_var(&self, bytes: &[u8], file: &mut TiFile) -> Result<()> {
        let model = file.model.ok_or_else(|| {
            CodecError::FormatUnrecognized("var file without a model signature".to_string())
        })?;

        let mut cursor = Cursor::new(bytes);
        let raw: [u8; TI_FILE_HEADER_SIZE] = cursor.read_array("var file header")?;
        file.header = Some(VarHeader::parse(&raw));

        if self.header_only {
            return Ok(());
        }

        match import_var_section(&mut cursor, model, &mut file.warnings)? {
            VarSection::Backup(backup) => {
                file.file_type = TiFileType::Backup;
                file.payload = TiFilePayload::Backup(backup);
            }
            VarSection::Vars {
                vars,
                group,
                checksum,
            } => {
                if group {
                    file.file_type = TiFileType::Group;
                    log::info!("Group file with {} variables", vars.len());
                }
                file.checksum = checksum;
                file.payload = TiFilePayload::Vars(vars);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
