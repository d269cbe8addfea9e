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

//! # Data Export Module
//!
//! This module writes rendered rows to their destination.
//!
//! ## Module Components
//!
//! - **Format** ([format.rs](format/index.html)): Destination extension to output format
//! - **Encoder** ([encoder.rs](encoder/index.html)): Delimited text escaping and forced enclosure
//! - **Disk** ([disk.rs](disk/index.html)): Storage backends receiving finished files
//! - **Output** ([output.rs](output/index.html)): Staging file, BOM fix-up and final move
//! - **Session** ([session.rs](session/index.html)): The export session tying it together
//!
//! ## Usage Patterns
//!
//! ```rust
//! use flatfiles::config::FfConfiguration;
//! use flatfiles::export::FfExport;
//! use flatfiles::fields::FfFieldsInput;
//!
//! let fields = FfFieldsInput::new()
//!     .field("name", "Name")
//!     .field("address.city", "City")
//!     .normalize()?;
//!
//! let mut export = FfExport::new(&FfConfiguration::default())?
//!     .with_fields(fields)
//!     .to_file("exports/customers.csv", false)?;
//!
//! export.add_header()?;
//! export.add_rows(&records)?;
//! let stats = export.finalize()?;
//! ```

pub mod disk;
pub mod encoder;
pub mod format;
pub mod output;
pub mod session;

pub use disk::{FfDisk, FfLocalDisk};
pub use encoder::FfDelimitedEncoder;
pub use format::FfFormat;
pub use output::{ensure_bom, FfDestination, FfOutputState, FfStreamOutput, UTF8_BOM};
pub use session::{FfExport, FfExportStats, FfRowFilter};
