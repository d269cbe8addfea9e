//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Flatfiles.
//! The Flatfiles project belongs to the Dunimd Team.
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

//! # Configuration Module
//!
//! Driver configuration for exports. The document shape is
//!
//! ```yaml
//! default: csv
//! drivers:
//!   csv:
//!     charset: UTF-8
//!     delimiter: ";"
//!     enclosure: "\""
//!     bom: true
//!     force_enclosure: false
//! ```
//!
//! Every key is optional. Missing keys take the defaults shown above.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{FfError, Result};

/// Environment variable overriding the default driver name.
pub const DRIVER_ENV: &str = "FLATFILE_DRIVER";

/// Name of the only driver this crate ships.
pub const CSV_DRIVER: &str = "csv";

/// Top-level configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FfConfiguration {
    /// Driver used when none is requested explicitly.
    #[serde(default = "default_driver")]
    pub default: String,
    /// Per-driver settings keyed by driver name.
    #[serde(default)]
    pub drivers: BTreeMap<String, FfCsvConfig>,
}

impl Default for FfConfiguration {
    fn default() -> Self {
        let mut drivers = BTreeMap::new();
        drivers.insert(CSV_DRIVER.to_string(), FfCsvConfig::default());
        Self {
            default: default_driver(),
            drivers,
        }
    }
}

impl FfConfiguration {
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Loads a configuration file, picking the parser from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Self::from_json_str(&source),
            "yaml" | "yml" => Self::from_yaml_str(&source),
            other => Err(FfError::configuration(format!(
                "cannot load configuration from '.{}' file {}",
                other,
                path.display()
            ))),
        }
    }

    /// Applies `FLATFILE_DRIVER` when it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(driver) = std::env::var(DRIVER_ENV) {
            let driver = driver.trim();
            if !driver.is_empty() {
                self.default = driver.to_string();
            }
        }
        self
    }

    /// Settings of the csv driver, defaults when the block is absent.
    pub fn csv(&self) -> FfCsvConfig {
        self.drivers.get(CSV_DRIVER).cloned().unwrap_or_default()
    }

    pub fn set_csv(&mut self, csv: FfCsvConfig) {
        self.drivers.insert(CSV_DRIVER.to_string(), csv);
    }
}

/// Settings of the delimited-text driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfCsvConfig {
    pub charset: String,
    pub delimiter: char,
    pub enclosure: char,
    /// Prepend a UTF-8 byte-order-mark when the export is finalized.
    pub bom: bool,
    /// Enclose every cell, not only those that need it.
    pub force_enclosure: bool,
}

impl Default for FfCsvConfig {
    fn default() -> Self {
        Self {
            charset: "UTF-8".to_string(),
            delimiter: ';',
            enclosure: '"',
            bom: true,
            force_enclosure: false,
        }
    }
}

impl FfCsvConfig {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_enclosure(mut self, enclosure: char) -> Self {
        self.enclosure = enclosure;
        self
    }

    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    pub fn with_force_enclosure(mut self, force: bool) -> Self {
        self.force_enclosure = force;
        self
    }

    /// Checks the invariants the encoder relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.charset.eq_ignore_ascii_case("utf-8") && !self.charset.eq_ignore_ascii_case("utf8") {
            return Err(FfError::configuration(format!(
                "unsupported charset '{}', only UTF-8 is written",
                self.charset
            )));
        }
        check_control_char("delimiter", self.delimiter)?;
        check_control_char("enclosure", self.enclosure)?;
        if self.delimiter == self.enclosure {
            return Err(FfError::configuration(format!(
                "delimiter and enclosure must differ, both are '{}'",
                self.delimiter
            )));
        }
        Ok(())
    }
}

fn check_control_char(name: &str, value: char) -> Result<()> {
    if !value.is_ascii() {
        return Err(FfError::configuration(format!(
            "{} must be a single ASCII character, got '{}'",
            name, value
        )));
    }
    if value == '\r' || value == '\n' {
        return Err(FfError::configuration(format!(
            "{} may not be a line break",
            name
        )));
    }
    Ok(())
}

fn default_driver() -> String {
    CSV_DRIVER.to_string()
}
