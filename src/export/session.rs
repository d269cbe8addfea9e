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

//! # Export Session Module
//!
//! [`FfExport`] binds a field list, a csv driver configuration and an output
//! for the lifetime of one export. Records are rendered and encoded one at a
//! time in the order they are handed in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{FfConfiguration, FfCsvConfig};
use crate::errors::{FfError, Result};
use crate::export::disk::FfDisk;
use crate::export::encoder::FfDelimitedEncoder;
use crate::export::format::FfFormat;
use crate::export::output::{FfDestination, FfOutputState, FfStreamOutput};
use crate::fields::{FfFieldSpecList, FfFields};
use crate::record::FfRecord;
use crate::render::{FfRenderer, FfRow};

/// Callback deciding whether a record is exported at all.
pub type FfRowFilter<'d> = Box<dyn FnMut(&FfRecord) -> bool + 'd>;

/// Statistics about a finished export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfExportStats {
    /// Lines written, header included.
    pub rows_written: u64,
    /// Size of the finished file in bytes.
    pub bytes_written: u64,
    pub destination: String,
}

/// One export session.
pub struct FfExport<'d> {
    csv: FfCsvConfig,
    fields: FfFieldSpecList,
    output: FfStreamOutput<'d>,
    encoder: Option<FfDelimitedEncoder>,
    before_each_row: Option<FfRowFilter<'d>>,
    rows_written: u64,
    header_written: bool,
    stats: Option<FfExportStats>,
}

impl<'d> FfExport<'d> {
    /// Session using the csv driver of `configuration`.
    pub fn new(configuration: &FfConfiguration) -> Result<Self> {
        Self::with_csv_config(configuration.csv())
    }

    pub fn with_csv_config(csv: FfCsvConfig) -> Result<Self> {
        csv.validate()?;
        Ok(Self {
            output: FfStreamOutput::new(csv.bom),
            csv,
            fields: FfFieldSpecList::default(),
            encoder: None,
            before_each_row: None,
            rows_written: 0,
            header_written: false,
            stats: None,
        })
    }

    pub fn with_fields(mut self, fields: FfFieldSpecList) -> Self {
        self.fields = fields;
        self
    }

    /// Normalizes the fields declared by `source`.
    pub fn with_fields_from<F: FfFields + ?Sized>(self, source: &F) -> Result<Self> {
        let fields = source.fields().normalize()?;
        Ok(self.with_fields(fields))
    }

    /// Stages into a caller-chosen file instead of a temporary one.
    pub fn using_staging_file(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.output.using_staging_file(path)?;
        Ok(self)
    }

    /// Registers a filter called with every record before it is rendered.
    pub fn before_each_row<F>(mut self, filter: F) -> Self
    where
        F: FnMut(&FfRecord) -> bool + 'd,
    {
        self.before_each_row = Some(Box::new(filter));
        self
    }

    /// Opens a local file destination.
    pub fn to_file(self, path: impl Into<PathBuf>, overwrite: bool) -> Result<Self> {
        self.open(FfDestination::File(path.into()), overwrite)
    }

    /// Opens a destination on a storage disk.
    pub fn to(self, path: impl Into<String>, disk: &'d dyn FfDisk, overwrite: bool) -> Result<Self> {
        self.open(
            FfDestination::Disk {
                disk,
                path: path.into(),
            },
            overwrite,
        )
    }

    fn open(mut self, destination: FfDestination<'d>, overwrite: bool) -> Result<Self> {
        match FfFormat::from_path(destination.path())? {
            FfFormat::Csv => self.encoder = Some(FfDelimitedEncoder::new(&self.csv)?),
        }
        self.output.open(destination, overwrite)?;
        Ok(self)
    }

    pub fn fields(&self) -> &FfFieldSpecList {
        &self.fields
    }

    pub fn csv_config(&self) -> &FfCsvConfig {
        &self.csv
    }

    pub fn state(&self) -> FfOutputState {
        self.output.state()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Writes the field labels. Only allowed before any other row.
    pub fn add_header(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.header_written || self.rows_written > 0 {
            return Err(FfError::invalid_state("header must be the first row of the export"));
        }
        let header = FfRenderer::new(&self.fields).header();
        self.append_row(&header)?;
        self.header_written = true;
        Ok(())
    }

    /// Renders and writes one record. Returns the number of rows written.
    pub fn add_row(&mut self, record: &FfRecord) -> Result<usize> {
        self.ensure_open()?;
        if !self.accepts(record) {
            return Ok(0);
        }
        let rows = FfRenderer::new(&self.fields).render(record)?;
        self.append_rows(&rows)
    }

    pub fn add_rows<'r, I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'r FfRecord>,
    {
        let mut written = 0;
        for record in records {
            written += self.add_row(record)?;
        }
        Ok(written)
    }

    /// Writes one row per item found under `relations`, each bound as `alias`.
    pub fn add_row_for_each_relation(&mut self, record: &FfRecord, relations: &[&str], alias: &str) -> Result<usize> {
        self.ensure_open()?;
        if !self.accepts(record) {
            return Ok(0);
        }
        let rows = FfRenderer::new(&self.fields).render_for_each_relation(record, relations, alias)?;
        self.append_rows(&rows)
    }

    /// Encodes an already rendered row into the output.
    pub fn append_row<S: AsRef<str>>(&mut self, row: &[Option<S>]) -> Result<()> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| FfError::invalid_state("export has no destination yet"))?;
        let encoded = encoder.encode_row(row)?;
        self.output.write_all(&encoded)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Adds the BOM if configured and moves the file to its destination.
    ///
    /// Calling it again returns the same statistics without touching the file.
    pub fn finalize(&mut self) -> Result<FfExportStats> {
        if let Some(stats) = &self.stats {
            return Ok(stats.clone());
        }
        self.output.finalize()?;

        let stats = FfExportStats {
            rows_written: self.rows_written,
            bytes_written: self.output.bytes_written(),
            destination: self
                .output
                .destination()
                .map(|d| d.to_string())
                .unwrap_or_default(),
        };
        self.stats = Some(stats.clone());
        Ok(stats)
    }

    fn append_rows(&mut self, rows: &[FfRow]) -> Result<usize> {
        for row in rows {
            self.append_row(row)?;
        }
        Ok(rows.len())
    }

    fn accepts(&mut self, record: &FfRecord) -> bool {
        match self.before_each_row.as_mut() {
            Some(filter) => filter(record),
            None => true,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        match self.output.state() {
            FfOutputState::Open => Ok(()),
            state => Err(FfError::invalid_state(format!(
                "rows can only be added to an open export, state is {:?}",
                state
            ))),
        }
    }
}
