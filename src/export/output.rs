//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Flatfiles.
//! The Flatfiles project belongs to the Dunimd project team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Stream Output Module
//!
//! Owns the local staging file an export is written to and moves it to its
//! destination when the export is finalized.
//!
//! ## Lifecycle
//!
//! `Unopened -> Open -> Finalized`. Bytes can only be written while `Open`.
//! Finalizing inserts the UTF-8 byte-order-mark if it is configured and not
//! yet present, then hands the staged bytes to the destination. Finalizing a
//! finalized output does nothing.
//!
//! ## Staging
//!
//! By default the staging file is a temporary file: next to the target for
//! local destinations (so the final move is a rename) and in the system temp
//! directory for disk destinations. Temporary staging files are removed when
//! the output is dropped without being finalized. A caller-named staging file
//! set with [`FfStreamOutput::using_staging_file`] is left in place instead.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, PathPersistError, TempPath};

use crate::errors::{FfError, Result};
use crate::export::disk::FfDisk;

/// UTF-8 byte-order-mark.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Where a finished export ends up.
pub enum FfDestination<'d> {
    /// Local file path.
    File(PathBuf),
    /// Path on a storage disk borrowed for the session.
    Disk { disk: &'d dyn FfDisk, path: String },
}

impl FfDestination<'_> {
    /// Path used for format detection.
    pub fn path(&self) -> &Path {
        match self {
            FfDestination::File(path) => path,
            FfDestination::Disk { path, .. } => Path::new(path),
        }
    }
}

impl fmt::Display for FfDestination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FfDestination::File(path) => write!(f, "{}", path.display()),
            FfDestination::Disk { path, .. } => write!(f, "disk:{}", path),
        }
    }
}

impl fmt::Debug for FfDestination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FfDestination({})", self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfOutputState {
    Unopened,
    Open,
    Finalized,
}

struct FfStaging {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Set when the staging file is temporary and removed on drop.
    temp: Option<TempPath>,
}

/// Staging file plus destination of one export session.
pub struct FfStreamOutput<'d> {
    state: FfOutputState,
    emit_bom: bool,
    staging_override: Option<PathBuf>,
    destination: Option<FfDestination<'d>>,
    staging: Option<FfStaging>,
    bytes_written: u64,
}

impl<'d> FfStreamOutput<'d> {
    pub fn new(emit_bom: bool) -> Self {
        Self {
            state: FfOutputState::Unopened,
            emit_bom,
            staging_override: None,
            destination: None,
            staging: None,
            bytes_written: 0,
        }
    }

    /// Stages into `path` instead of a temporary file.
    pub fn using_staging_file(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        if self.state != FfOutputState::Unopened {
            return Err(FfError::invalid_state("staging file must be chosen before the output is opened"));
        }
        self.staging_override = Some(path.into());
        Ok(())
    }

    pub fn state(&self) -> FfOutputState {
        self.state
    }

    /// Bytes in the finished file, BOM included once it has been inserted.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn destination(&self) -> Option<&FfDestination<'d>> {
        self.destination.as_ref()
    }

    pub fn staging_path(&self) -> Option<&Path> {
        self.staging.as_ref().map(|s| s.path.as_path())
    }

    /// Checks the destination and creates the staging file.
    pub fn open(&mut self, destination: FfDestination<'d>, overwrite: bool) -> Result<()> {
        if self.state != FfOutputState::Unopened {
            return Err(FfError::invalid_state("output is already open"));
        }

        let staging = match &destination {
            FfDestination::File(target) => {
                if target.exists() {
                    if !overwrite {
                        return Err(FfError::already_exists(target.display().to_string()));
                    }
                    log::debug!("delete existing export file: {}", target.display());
                    fs::remove_file(target)?;
                }
                let parent = parent_dir(target);
                fs::create_dir_all(parent)?;
                self.create_staging(parent)?
            }
            FfDestination::Disk { disk, path } => {
                if disk.exists(path)? {
                    if !overwrite {
                        return Err(FfError::already_exists(format!("disk:{}", path)));
                    }
                    log::debug!("delete existing export file on disk: {}", path);
                    disk.delete(path)?;
                }
                self.create_staging(&std::env::temp_dir())?
            }
        };

        log::debug!("staging export for {} in {}", destination, staging.path.display());
        self.staging = Some(staging);
        self.destination = Some(destination);
        self.state = FfOutputState::Open;
        Ok(())
    }

    /// Appends bytes to the staging file.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let staging = self.open_staging()?;
        staging.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Inserts the BOM if needed and moves the staged bytes to the destination.
    ///
    /// The staging file is only released once the destination holds the
    /// bytes. On error the output stays `Open` with its staged rows, so the
    /// caller can retry, keep writing or drop it.
    pub fn finalize(&mut self) -> Result<()> {
        match self.state {
            FfOutputState::Finalized => return Ok(()),
            FfOutputState::Unopened => return Err(FfError::invalid_state("output was never opened")),
            FfOutputState::Open => {}
        }

        let staging = self
            .staging
            .as_mut()
            .ok_or_else(|| FfError::invalid_state("staging file was already released"))?;
        staging.writer.flush()?;

        if self.emit_bom && ensure_bom(staging.writer.get_mut())? {
            log::debug!("inserted byte-order-mark into {}", staging.path.display());
            self.bytes_written += UTF8_BOM.len() as u64;
        }
        staging.writer.get_ref().sync_all()?;

        let uploaded = match self.destination.as_ref() {
            Some(FfDestination::File(target)) => {
                publish_file(staging, target)?;
                false
            }
            Some(FfDestination::Disk { disk, path }) => {
                let file = staging.writer.get_mut();
                file.seek(SeekFrom::Start(0))?;
                let stored = disk.put_stream(path, &mut *file);
                file.seek(SeekFrom::End(0))?;
                stored?;
                true
            }
            None => return Err(FfError::invalid_state("output has no destination")),
        };

        if let Some(FfStaging { writer, path, temp }) = self.staging.take() {
            drop(writer);
            if uploaded {
                let removed = match temp {
                    Some(temp) => temp.close(),
                    None => fs::remove_file(&path),
                };
                if let Err(err) = removed {
                    log::warn!("could not remove staging file {}: {}", path.display(), err);
                }
            }
        }

        self.state = FfOutputState::Finalized;
        if let Some(destination) = &self.destination {
            log::info!("export finalized: {} ({} bytes)", destination, self.bytes_written);
        }
        Ok(())
    }

    fn open_staging(&mut self) -> Result<&mut FfStaging> {
        if self.state != FfOutputState::Open {
            return Err(FfError::invalid_state(format!(
                "cannot write to an output in state {:?}",
                self.state
            )));
        }
        self.staging
            .as_mut()
            .ok_or_else(|| FfError::invalid_state("staging file was already released"))
    }

    fn create_staging(&self, temp_dir: &Path) -> Result<FfStaging> {
        if let Some(path) = &self.staging_override {
            fs::create_dir_all(parent_dir(path))?;
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            return Ok(FfStaging {
                writer: BufWriter::new(file),
                path: path.clone(),
                temp: None,
            });
        }

        let (file, temp) = Builder::new()
            .prefix(".ffe")
            .suffix(".tmp")
            .tempfile_in(temp_dir)?
            .into_parts();
        Ok(FfStaging {
            writer: BufWriter::new(file),
            path: temp.to_path_buf(),
            temp: Some(temp),
        })
    }
}

/// Prepends the UTF-8 BOM unless the content already starts with it.
///
/// Returns whether the BOM was inserted. Calling it again is a no-op. The
/// cursor is left at the end either way, so writing can continue.
pub fn ensure_bom<F: Read + Write + Seek>(file: &mut F) -> io::Result<bool> {
    file.seek(SeekFrom::Start(0))?;
    let mut head = Vec::with_capacity(UTF8_BOM.len());
    Read::by_ref(file).take(UTF8_BOM.len() as u64).read_to_end(&mut head)?;
    if head == UTF8_BOM {
        file.seek(SeekFrom::End(0))?;
        return Ok(false);
    }

    file.seek(SeekFrom::Start(0))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&UTF8_BOM)?;
    file.write_all(&content)?;
    file.flush()?;
    Ok(true)
}

/// Moves the staged file onto a local target without replacing anything
/// that appeared there after the output was opened.
fn publish_file(staging: &mut FfStaging, target: &Path) -> Result<()> {
    match staging.temp.take() {
        Some(temp) => match temp.persist_noclobber(target) {
            Ok(()) => {
                staging.path = target.to_path_buf();
                Ok(())
            }
            Err(PathPersistError { error, path }) => {
                staging.temp = Some(path);
                if error.kind() == io::ErrorKind::AlreadyExists {
                    Err(FfError::already_exists(target.display().to_string()))
                } else {
                    Err(error.into())
                }
            }
        },
        None if staging.path == target => Ok(()),
        None => {
            if target.exists() {
                return Err(FfError::already_exists(target.display().to_string()));
            }
            move_file(&staging.path, target)?;
            staging.path = target.to_path_buf();
            Ok(())
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // rename fails across filesystems
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
