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

//! # Storage Disk Module
//!
//! A disk is the persistent storage an export is finally uploaded to. It only
//! has to answer whether a path exists, delete a path and accept a byte
//! stream; exports never read back from it. [`FfLocalDisk`] stores files below
//! a root directory; object stores or remote filesystems implement [`FfDisk`]
//! in the embedding application.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::{FfError, Result};

/// Storage backend receiving finished exports.
pub trait FfDisk {
    /// Whether `path` is already present on the disk.
    fn exists(&self, path: &str) -> Result<bool>;

    fn delete(&self, path: &str) -> Result<()>;

    /// Stores everything readable from `contents` under `path`, replacing
    /// any previous content, and returns the number of bytes stored.
    fn put_stream(&self, path: &str, contents: &mut dyn Read) -> Result<u64>;
}

/// Disk rooted at a local directory.
#[derive(Clone, Debug)]
pub struct FfLocalDisk {
    root: PathBuf,
}

impl FfLocalDisk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a disk path. Paths escaping the root are rejected.
    pub fn path(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(FfError::configuration(format!(
                "disk path '{}' must stay below the disk root",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl FfDisk for FfLocalDisk {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.path(path)?.exists())
    }

    fn delete(&self, path: &str) -> Result<()> {
        match fs::remove_file(self.path(path)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn put_stream(&self, path: &str, contents: &mut dyn Read) -> Result<u64> {
        let target = self.path(path)?;
        let parent = target.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent)?;

        // write next to the target, then rename over it
        let mut temp = NamedTempFile::new_in(parent)?;
        let written = io::copy(contents, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(&target)?;
        Ok(written)
    }
}
