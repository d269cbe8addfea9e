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

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::Read;

use anyhow::anyhow;
use flatfiles::config::{FfConfiguration, FfCsvConfig};
use flatfiles::export::{FfDisk, FfExport, FfLocalDisk, FfOutputState, UTF8_BOM};
use flatfiles::fields::{FfFieldMapping, FfFields, FfFieldsInput};
use flatfiles::record::FfRecord;
use flatfiles::transform::FfTransform;
use flatfiles::{FfError, FfFieldSpecList};
use serde_json::{json, Value};

#[derive(Default)]
struct MemoryDisk {
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl FfDisk for MemoryDisk {
    fn exists(&self, path: &str) -> flatfiles::Result<bool> {
        Ok(self.files.borrow().contains_key(path))
    }

    fn delete(&self, path: &str) -> flatfiles::Result<()> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn put_stream(&self, path: &str, contents: &mut dyn Read) -> flatfiles::Result<u64> {
        let mut buffer = Vec::new();
        contents.read_to_end(&mut buffer)?;
        let size = buffer.len() as u64;
        self.files.borrow_mut().insert(path.to_string(), buffer);
        Ok(size)
    }
}

/// Disk whose first upload fails.
#[derive(Default)]
struct FlakyDisk {
    failed_once: Cell<bool>,
    inner: MemoryDisk,
}

impl FfDisk for FlakyDisk {
    fn exists(&self, path: &str) -> flatfiles::Result<bool> {
        self.inner.exists(path)
    }

    fn delete(&self, path: &str) -> flatfiles::Result<()> {
        self.inner.delete(path)
    }

    fn put_stream(&self, path: &str, contents: &mut dyn Read) -> flatfiles::Result<u64> {
        if !self.failed_once.replace(true) {
            let mut partial = [0u8; 2];
            contents.read_exact(&mut partial)?;
            return Err(FfError::Io("network down".to_string()));
        }
        self.inner.put_stream(path, contents)
    }
}

struct PeopleExport;

impl FfFields for PeopleExport {
    fn fields(&self) -> FfFieldsInput {
        FfFieldsInput::new()
            .field("name", "Name")
            .field("age", FfFieldMapping::new().column("years").label("Age"))
    }
}

fn people_fields() -> FfFieldSpecList {
    PeopleExport.fields().normalize().unwrap()
}

fn people() -> Vec<FfRecord> {
    vec![
        FfRecord::from_value(json!({"name": "Ada", "years": 36, "active": true})).unwrap(),
        FfRecord::from_value(json!({"name": "Grace", "years": 45, "active": false})).unwrap(),
    ]
}

fn with_bom(body: &str) -> Vec<u8> {
    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

#[test]
fn exports_header_and_rows_to_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields_from(&PeopleExport)
        .unwrap()
        .to_file(&target, false)
        .unwrap();
    assert_eq!(export.state(), FfOutputState::Open);

    export.add_header().unwrap();
    assert_eq!(export.add_rows(&people()).unwrap(), 2);
    let stats = export.finalize().unwrap();

    let content = fs::read(&target).unwrap();
    assert_eq!(content, with_bom("Name;Age\r\nAda;36\r\nGrace;45\r\n"));
    assert_eq!(stats.rows_written, 3);
    assert_eq!(stats.bytes_written, content.len() as u64);
    assert_eq!(stats.destination, target.display().to_string());
    assert_eq!(export.state(), FfOutputState::Finalized);
}

#[test]
fn existing_target_needs_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");
    fs::write(&target, "old").unwrap();

    let refused = FfExport::new(&FfConfiguration::default()).unwrap().to_file(&target, false);
    assert!(matches!(refused, Err(FfError::AlreadyExists { .. })));
    assert_eq!(fs::read_to_string(&target).unwrap(), "old");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to_file(&target, true)
        .unwrap();
    export.add_row(&people()[0]).unwrap();
    export.finalize().unwrap();
    assert_eq!(fs::read(&target).unwrap(), with_bom("Ada;36\r\n"));
}

#[test]
fn bom_and_forced_enclosure_follow_configuration() {
    let configuration = FfConfiguration::from_yaml_str(
        r#"
drivers:
  csv:
    bom: false
    force_enclosure: true
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.CSV");

    let mut export = FfExport::new(&configuration)
        .unwrap()
        .with_fields(people_fields())
        .to_file(&target, false)
        .unwrap();
    export.add_header().unwrap();
    export.add_row(&people()[1]).unwrap();
    export.finalize().unwrap();

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "\"Name\";\"Age\"\r\n\"Grace\";\"45\"\r\n"
    );
}

#[test]
fn unsupported_extension_is_rejected() {
    let disk = MemoryDisk::default();
    let result = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .to("people.xlsx", &disk, false);
    assert!(matches!(result, Err(FfError::UnsupportedFormat { .. })));
}

#[test]
fn exports_to_a_local_disk() {
    let dir = tempfile::tempdir().unwrap();
    let disk = FfLocalDisk::new(dir.path());

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to("daily/people.csv", &disk, false)
        .unwrap();
    export.add_header().unwrap();
    export.add_rows(&people()).unwrap();
    let stats = export.finalize().unwrap();

    let content = fs::read(dir.path().join("daily/people.csv")).unwrap();
    assert_eq!(content, with_bom("Name;Age\r\nAda;36\r\nGrace;45\r\n"));
    assert_eq!(stats.destination, "disk:daily/people.csv");
    assert_eq!(stats.bytes_written, content.len() as u64);
}

#[test]
fn uploads_to_a_custom_disk_and_overwrites() {
    let disk = MemoryDisk::default();
    disk.files
        .borrow_mut()
        .insert("people.csv".to_string(), b"old".to_vec());

    let refused = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .to("people.csv", &disk, false);
    assert!(matches!(refused, Err(FfError::AlreadyExists { .. })));

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to("people.csv", &disk, true)
        .unwrap();
    export.add_row(&people()[0]).unwrap();
    export.finalize().unwrap();

    assert_eq!(disk.files.borrow().get("people.csv"), Some(&with_bom("Ada;36\r\n")));
}

#[test]
fn caller_staging_file_is_moved_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging").join("people.part");
    let target = dir.path().join("out").join("people.csv");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .using_staging_file(&staging)
        .unwrap()
        .to_file(&target, false)
        .unwrap();
    export.add_row(&people()[0]).unwrap();
    assert!(staging.exists());
    export.finalize().unwrap();

    assert!(!staging.exists());
    assert_eq!(fs::read(&target).unwrap(), with_bom("Ada;36\r\n"));
}

#[test]
fn staging_file_may_be_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .using_staging_file(&target)
        .unwrap()
        .to_file(&target, false)
        .unwrap();
    export.add_row(&people()[1]).unwrap();
    export.finalize().unwrap();

    assert_eq!(fs::read(&target).unwrap(), with_bom("Grace;45\r\n"));
}

#[test]
fn finalize_twice_keeps_a_single_bom() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to_file(&target, false)
        .unwrap();
    export.add_row(&people()[0]).unwrap();

    let first = export.finalize().unwrap();
    let second = export.finalize().unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&target).unwrap(), with_bom("Ada;36\r\n"));
}

#[test]
fn rows_after_finalize_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to_file(&target, false)
        .unwrap();
    export.finalize().unwrap();

    assert!(matches!(export.add_row(&people()[0]), Err(FfError::InvalidState { .. })));
    assert!(matches!(export.add_header(), Err(FfError::InvalidState { .. })));
    assert_eq!(fs::read(&target).unwrap(), UTF8_BOM.to_vec());
}

#[test]
fn header_must_come_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to_file(dir.path().join("people.csv"), false)
        .unwrap();

    export.add_row(&people()[0]).unwrap();
    assert!(matches!(export.add_header(), Err(FfError::InvalidState { .. })));
}

#[test]
fn before_each_row_skips_records() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("active.csv");
    let csv = FfCsvConfig::default().with_bom(false);

    let mut export = FfExport::with_csv_config(csv)
        .unwrap()
        .with_fields(people_fields())
        .before_each_row(|record| record.get("active").and_then(Value::as_bool).unwrap_or(false))
        .to_file(&target, false)
        .unwrap();

    let records = people();
    assert_eq!(export.add_row(&records[0]).unwrap(), 1);
    assert_eq!(export.add_row(&records[1]).unwrap(), 0);
    let stats = export.finalize().unwrap();

    assert_eq!(stats.rows_written, 1);
    assert_eq!(fs::read_to_string(&target).unwrap(), "Ada;36\r\n");
}

#[test]
fn fans_out_related_items_into_rows() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("lines.csv");
    let fields = FfFieldsInput::new()
        .field("number", "Order")
        .field("line.sku", "SKU")
        .field("line.qty", "Qty")
        .normalize()
        .unwrap();
    let order = FfRecord::from_value(json!({
        "number": "A-17",
        "lines": [{"sku": "P1", "qty": 2}, {"sku": "P2", "qty": 1}]
    }))
    .unwrap();

    let mut export = FfExport::with_csv_config(FfCsvConfig::default().with_bom(false))
        .unwrap()
        .with_fields(fields)
        .to_file(&target, false)
        .unwrap();
    export.add_header().unwrap();
    assert_eq!(export.add_row_for_each_relation(&order, &["lines"], "line").unwrap(), 2);
    export.finalize().unwrap();

    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        "Order;SKU;Qty\r\nA-17;P1;2\r\nA-17;P2;1\r\n"
    );
}

#[test]
fn dropping_an_open_export_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut export = FfExport::new(&FfConfiguration::default())
            .unwrap()
            .with_fields(people_fields())
            .to_file(dir.path().join("people.csv"), false)
            .unwrap();
        export.add_rows(&people()).unwrap();
    }
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn transform_error_keeps_earlier_rows() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");
    let strict_age = FfTransform::new(|value, _| match value.as_u64() {
        Some(age) if age < 40 => Ok(None),
        _ => Err(anyhow!("age out of range")),
    });
    let fields = FfFieldsInput::new()
        .field("name", "Name")
        .field("years", strict_age)
        .normalize()
        .unwrap();

    let mut export = FfExport::with_csv_config(FfCsvConfig::default().with_bom(false))
        .unwrap()
        .with_fields(fields)
        .to_file(&target, false)
        .unwrap();
    let records = people();
    export.add_row(&records[0]).unwrap();
    let err = export.add_row(&records[1]);
    assert!(matches!(err, Err(FfError::Transform { ref column, .. }) if column == "years"));

    let stats = export.finalize().unwrap();
    assert_eq!(stats.rows_written, 1);
    assert_eq!(fs::read_to_string(&target).unwrap(), "Ada;36\r\n");
}

#[test]
fn failed_upload_keeps_staged_rows() {
    let disk = FlakyDisk::default();
    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to("people.csv", &disk, false)
        .unwrap();
    export.add_row(&people()[0]).unwrap();

    let failed = export.finalize();
    assert!(matches!(failed, Err(FfError::Io(ref message)) if message == "network down"));
    assert_eq!(export.state(), FfOutputState::Open);
    assert!(disk.inner.files.borrow().is_empty());

    export.add_row(&people()[1]).unwrap();
    let stats = export.finalize().unwrap();

    let stored = with_bom("Ada;36\r\nGrace;45\r\n");
    assert_eq!(disk.inner.files.borrow().get("people.csv"), Some(&stored));
    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.bytes_written, stored.len() as u64);
}

#[test]
fn finalize_does_not_replace_a_file_created_after_open() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("people.csv");

    let mut export = FfExport::new(&FfConfiguration::default())
        .unwrap()
        .with_fields(people_fields())
        .to_file(&target, false)
        .unwrap();
    export.add_row(&people()[0]).unwrap();
    fs::write(&target, "someone else").unwrap();

    assert!(matches!(export.finalize(), Err(FfError::AlreadyExists { .. })));
    assert_eq!(fs::read_to_string(&target).unwrap(), "someone else");
    assert_eq!(export.state(), FfOutputState::Open);

    fs::remove_file(&target).unwrap();
    export.finalize().unwrap();
    assert_eq!(fs::read(&target).unwrap(), with_bom("Ada;36\r\n"));
}
