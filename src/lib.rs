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

//! # Flatfiles Library
//!
//! Streaming export of structured records into delimited flat files with
//! configurable delimiter, enclosure, forced enclosure and byte-order-mark.
//!
//! ## Module Overview
//!
//! - **record**: FfRecord, read views and dotted-path lookup
//! - **config**: Driver configuration loaded from JSON/YAML
//! - **transform**: Per-field transforms and the named transform registry
//! - **fields**: Field configuration shapes and their normalization
//! - **render**: Row rendering and relation fan-out
//! - **export**: Encoder, staging output, storage disks and the export session
//!
//! ## Pipeline
//!
//! 1. Field configuration is normalized once into an `FfFieldSpecList`
//! 2. Each record is rendered into one row, or one row per related item
//! 3. Rows are encoded and appended to a staging file
//! 4. Finalizing inserts the BOM and moves the file to its destination
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FfError>`. Nothing is retried and no
//! error is swallowed; a failed export has to be restarted with a new session.

pub mod config;
pub mod errors;
pub mod export;
pub mod fields;
pub mod record;
pub mod render;
pub mod transform;

pub use config::{FfConfiguration, FfCsvConfig};
pub use errors::{FfError, Result};
pub use export::{FfDelimitedEncoder, FfDisk, FfExport, FfExportStats, FfFormat, FfLocalDisk};
pub use fields::{FfFieldKey, FfFieldMapping, FfFieldSpec, FfFieldSpecList, FfFieldValue, FfFields, FfFieldsInput};
pub use record::{FfAttributes, FfFieldPath, FfRecord, FfRecordView};
pub use render::{FfRenderer, FfRow};
pub use transform::{FfTransform, FfTransformRegistry};
