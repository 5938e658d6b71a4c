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

//! Command line front end
//!
//! Inspects TI files, pulls the ROM image out of save states and splits
//! group files into single variable files.

use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use ticodec::core::{CalcModel, CodecError, Config, TiFile, TiFileImporter, TiFileType};

/// TI calculator file inspector
#[derive(Parser)]
#[command(name = "ticodec")]
#[command(about = "Inspect and convert TI calculator emulator files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print what a file contains
    Info {
        file: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,

        /// Only read headers
        #[arg(long)]
        header_only: bool,
    },
    /// Write the ROM image held by a save state or ROM dump
    ExtractRom { file: PathBuf, output: PathBuf },
    /// Write every variable of a group file to its own file
    SplitGroup { file: PathBuf, output_dir: PathBuf },
}

fn var_extension(model: CalcModel) -> &'static str {
    match model {
        CalcModel::Ti73 => "73v",
        CalcModel::Ti82 => "82v",
        CalcModel::Ti83 => "83v",
        CalcModel::Ti85 => "85v",
        CalcModel::Ti86 => "86v",
        _ => "8xv",
    }
}

fn print_info(file: &TiFile, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summary = file.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Type:  {:?}", summary.file_type);
    if let Some(model) = &summary.model {
        println!("Model: {}", model);
    }
    if let Some(comment) = &summary.comment {
        println!("Comment: {}", comment);
    }
    if let Some(version) = &summary.rom_version {
        println!("ROM version: {}", version);
    }
    if let Some(name) = &summary.flash_name {
        println!("Flash name: {}", name);
    }
    if let Some(date) = &summary.flash_date {
        println!("Flash date: {}", date);
    }
    if let Some(pages) = summary.flash_pages {
        println!("Flash pages: {}", pages);
    }
    if let Some(version) = &summary.save_version {
        println!("Save version: {}", version);
    }
    if let Some(author) = &summary.save_author {
        println!("Author: {}", author);
    }
    if !summary.chunks.is_empty() {
        println!("Chunks: {}", summary.chunks.join(" "));
    }
    for var in &summary.vars {
        let archived = if var.archived { " (archived)" } else { "" };
        println!(
            "  {:<8} type {:02X} {:>5} bytes{}",
            var.name, var.var_type, var.length, archived
        );
    }
    for warning in &summary.warnings {
        println!("Warning: {}", warning);
    }
    Ok(())
}

fn extract_rom(importer: &TiFileImporter, path: &Path, output: &Path) -> ticodec::core::Result<()> {
    let file = importer.import_path(path)?;
    let rom = match file.file_type() {
        TiFileType::Sav => file.save().and_then(|s| s.rom_only()),
        TiFileType::Rom => file.rom().map(|r| r.data.as_slice()),
        _ => None,
    }
    .ok_or_else(|| CodecError::MissingChunk(format!("{} holds no ROM image", path.display())))?;

    fs::write(output, rom)?;
    info!("Wrote {} bytes to {}", rom.len(), output.display());
    Ok(())
}

fn split_group(
    importer: &TiFileImporter,
    config: &Config,
    path: &Path,
    output_dir: &Path,
) -> ticodec::core::Result<()> {
    let file = importer.import_path(path)?;
    let model = file
        .model()
        .ok_or_else(|| CodecError::ModelDetection(format!("{} has no model", path.display())))?;
    if !matches!(file.file_type(), TiFileType::Group | TiFileType::Var) {
        return Err(CodecError::UnsupportedFormat(format!(
            "{} is not a variable file",
            path.display()
        )));
    }

    fs::create_dir_all(output_dir)?;
    for (index, var) in file.vars().iter().enumerate() {
        let name = var.name_str();
        let stem = if name.is_empty() {
            format!("var{}", index)
        } else {
            name.replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        };
        let target = output_dir.join(format!("{}.{}", stem, var_extension(model)));

        let out = fs::File::create(&target)?;
        TiFile::export_vars(
            std::io::BufWriter::new(out),
            model,
            std::slice::from_ref(var),
            &config.export.comment,
        )?;
        info!("Wrote {}", target.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let config = Config::load()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Info {
            file,
            json,
            header_only,
        } => {
            let importer =
                TiFileImporter::new().header_only(header_only || config.import.header_only);
            let imported = importer.import_path(&file)?;
            return print_info(&imported, json);
        }
        Command::ExtractRom { file, output } => {
            let importer = TiFileImporter::new();
            extract_rom(&importer, &file, &output)
        }
        Command::SplitGroup { file, output_dir } => {
            let importer = TiFileImporter::new();
            split_group(&importer, &config, &file, &output_dir)
        }
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    Ok(result?)
}
