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

//! # Delimited Encoder Module
//!
//! Serializes rows into delimited text. Escaping is delegated to the `csv`
//! writer: a cell is enclosed when it contains the delimiter, the enclosure, a
//! line feed or a carriage return, and enclosures inside it are doubled. Rows
//! end with CRLF and null cells are written as empty, unenclosed fields, so a
//! row holding a single null cell is a bare line.
//!
//! ## Forced Enclosure
//!
//! Forced enclosure is layered on top of that routine in two passes:
//!
//! 1. every cell is prefixed with a private marker that contains a carriage
//!    return, so the csv writer has to enclose it
//! 2. before the bytes leave the encoder, every enclosure that directly
//!    follows the row start or a delimiter and is followed by the marker is
//!    kept while the marker is removed
//!
//! Enclosures inside a cell are always doubled, so an enclosure that starts a
//! cell is the only place the marker can follow a delimiter and enclosure.

use std::io::Write;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use regex::bytes::{Captures, Regex};

use crate::config::FfCsvConfig;
use crate::errors::{FfError, Result};

/// Prefix that makes the csv writer enclose a cell.
const FORCE_MARKER: &str = "\r\x1f";

/// Encodes rows according to one csv driver configuration.
#[derive(Debug, Clone)]
pub struct FfDelimitedEncoder {
    delimiter: u8,
    enclosure: u8,
    force_enclosure: bool,
    marker_filter: Option<Regex>,
}

impl FfDelimitedEncoder {
    pub fn new(config: &FfCsvConfig) -> Result<Self> {
        config.validate()?;
        let delimiter = config.delimiter as u8;
        let enclosure = config.enclosure as u8;

        let marker_filter = if config.force_enclosure {
            let pattern = format!(
                "(^|{}){}{}",
                regex::escape(&config.delimiter.to_string()),
                regex::escape(&config.enclosure.to_string()),
                regex::escape(FORCE_MARKER),
            );
            let regex = Regex::new(&pattern)
                .map_err(|e| FfError::configuration(format!("invalid enclosure filter: {}", e)))?;
            Some(regex)
        } else {
            None
        };

        Ok(Self {
            delimiter,
            enclosure,
            force_enclosure: config.force_enclosure,
            marker_filter,
        })
    }

    pub fn force_enclosure(&self) -> bool {
        self.force_enclosure
    }

    /// Encodes one row, terminator included.
    pub fn encode_row<S: AsRef<str>>(&self, row: &[Option<S>]) -> Result<Vec<u8>> {
        // a lone null cell stays unenclosed, which leaves a bare line
        let lone_null = !self.force_enclosure && row.len() == 1 && row[0].is_none();
        if row.is_empty() || lone_null {
            return Ok(b"\r\n".to_vec());
        }

        let cells = self.mark_cells(row);
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.enclosure)
            .double_quote(true)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::CRLF)
            .has_headers(false)
            .from_writer(Vec::with_capacity(64));

        writer
            .write_record(&cells)
            .map_err(|e| FfError::Io(format!("csv write error: {}", e)))?;
        let encoded = writer
            .into_inner()
            .map_err(|e| FfError::Io(format!("csv flush error: {}", e.error())))?;

        Ok(self.strip_markers(encoded))
    }

    /// Encodes `row` and writes it to `sink`, returning the bytes written.
    pub fn append_row<W, S>(&self, sink: &mut W, row: &[Option<S>]) -> Result<usize>
    where
        W: Write + ?Sized,
        S: AsRef<str>,
    {
        let encoded = self.encode_row(row)?;
        sink.write_all(&encoded)?;
        Ok(encoded.len())
    }

    fn mark_cells<S: AsRef<str>>(&self, row: &[Option<S>]) -> Vec<String> {
        row.iter()
            .map(|cell| {
                let text = cell.as_ref().map(|s| s.as_ref()).unwrap_or("");
                if self.force_enclosure {
                    format!("{}{}", FORCE_MARKER, text)
                } else {
                    text.to_string()
                }
            })
            .collect()
    }

    fn strip_markers(&self, encoded: Vec<u8>) -> Vec<u8> {
        match &self.marker_filter {
            Some(filter) => {
                let enclosure = self.enclosure;
                filter
                    .replace_all(&encoded, |caps: &Captures<'_>| {
                        let mut kept = caps[1].to_vec();
                        kept.push(enclosure);
                        kept
                    })
                    .into_owned()
            }
            None => encoded,
        }
    }
}
