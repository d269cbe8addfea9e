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

use flatfiles::config::FfCsvConfig;
use flatfiles::export::FfDelimitedEncoder;
use flatfiles::FfError;
use proptest::prelude::*;

fn encoder(config: FfCsvConfig) -> FfDelimitedEncoder {
    FfDelimitedEncoder::new(&config).unwrap()
}

fn decode(bytes: &[u8], delimiter: u8, quote: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quote(quote)
        .from_reader(bytes);
    // the reader skips blank lines, which is how a lone null cell is written
    match reader.records().next() {
        Some(record) => record.unwrap().iter().map(str::to_string).collect(),
        None => vec![String::new()],
    }
}

fn dialect() -> impl Strategy<Value = (char, char)> {
    prop_oneof![Just((';', '"')), Just((',', '\'')), Just(('\t', '|'))]
}

#[test]
fn doubles_enclosures_inside_cells() {
    let bytes = encoder(FfCsvConfig::default())
        .encode_row(&[Some("He said \"hi\""), Some("ok")])
        .unwrap();
    assert_eq!(bytes, b"\"He said \"\"hi\"\"\";ok\r\n");
}

#[test]
fn encloses_line_breaks() {
    let bytes = encoder(FfCsvConfig::default())
        .encode_row(&[Some("line1\nline2"), Some("x")])
        .unwrap();
    assert_eq!(bytes, b"\"line1\nline2\";x\r\n");
}

#[test]
fn forced_enclosure_wraps_numbers_and_escapes_once() {
    let forced = encoder(FfCsvConfig::default().with_force_enclosure(true));
    assert_eq!(forced.encode_row(&[Some("5")]).unwrap(), b"\"5\"\r\n");
    assert_eq!(
        forced.encode_row(&[Some("He said \"hi\""), Some(";")]).unwrap(),
        b"\"He said \"\"hi\"\"\";\";\"\r\n"
    );
}

#[test]
fn custom_delimiter_and_enclosure() {
    let config = FfCsvConfig::default().with_delimiter(',').with_enclosure('\'');
    let bytes = encoder(config)
        .encode_row(&[Some("it's"), Some("a,b"), Some("plain")])
        .unwrap();
    assert_eq!(bytes, b"'it''s','a,b',plain\r\n");
}

#[test]
fn append_row_reports_bytes_written() {
    let mut sink: Vec<u8> = Vec::new();
    let enc = encoder(FfCsvConfig::default());
    let first = enc.append_row(&mut sink, &[Some("a"), Some("b")]).unwrap();
    let second = enc.append_row(&mut sink, &[None::<&str>, Some("c")]).unwrap();
    assert_eq!((first, second), (5, 4));
    assert_eq!(sink, b"a;b\r\n;c\r\n");
}

#[test]
fn invalid_config_is_rejected() {
    let result = FfDelimitedEncoder::new(&FfCsvConfig::default().with_enclosure(';'));
    assert!(matches!(result, Err(FfError::Configuration { .. })));
}

#[test]
fn lone_null_cell_writes_a_bare_line() {
    let bytes = encoder(FfCsvConfig::default()).encode_row(&[None::<&str>]).unwrap();
    assert_eq!(bytes, b"\r\n");
}

#[test]
fn encloses_carriage_returns() {
    let bytes = encoder(FfCsvConfig::default())
        .encode_row(&[Some("a\rb"), None])
        .unwrap();
    assert_eq!(bytes, b"\"a\rb\";\r\n");
}

proptest! {
    #[test]
    fn encoded_rows_decode_to_the_same_cells(
        cells in prop::collection::vec(
            prop::option::of("[a-zA-Z0-9 ;,'\"|\t\r\n]{0,12}"),
            1..6,
        ),
        (delimiter, enclosure) in dialect(),
        forced in any::<bool>(),
    ) {
        let config = FfCsvConfig::default()
            .with_delimiter(delimiter)
            .with_enclosure(enclosure)
            .with_force_enclosure(forced);
        let bytes = encoder(config).encode_row(&cells).unwrap();

        prop_assert!(bytes.ends_with(b"\r\n"));
        prop_assert!(!bytes.windows(2).any(|w| w == b"\r\x1f"));
        if forced {
            prop_assert_eq!(bytes[0], enclosure as u8);
        }

        let expected: Vec<String> = cells.iter().map(|c| c.clone().unwrap_or_default()).collect();
        prop_assert_eq!(decode(&bytes, delimiter as u8, enclosure as u8), expected);
    }

    #[test]
    fn forced_alphanumeric_cells_are_wrapped_exactly(
        cells in prop::collection::vec("[a-zA-Z0-9]{0,8}", 1..6),
    ) {
        let enc = encoder(FfCsvConfig::default().with_force_enclosure(true));
        let row: Vec<Option<&str>> = cells.iter().map(|c| Some(c.as_str())).collect();
        let expected: Vec<String> = cells.iter().map(|c| format!("\"{}\"", c)).collect();
        let expected = format!("{}\r\n", expected.join(";"));
        prop_assert_eq!(enc.encode_row(&row).unwrap(), expected.into_bytes());
    }
}
