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

//! # Flatfiles Error Module
//!
//! This module defines the error type shared by every stage of an export:
//! field normalization, row rendering, encoding and output handling.
//!
//! ## Error Categories
//!
//! - **Configuration**: Malformed field specification or csv driver settings
//! - **AlreadyExists**: Destination present and overwrite was not requested
//! - **UnsupportedFormat**: Destination extension has no encoder
//! - **Transform**: A per-field transform failed while rendering a row
//! - **InvalidState**: Session used outside of its `Open` state
//! - **Io**: Filesystem or storage failures
//! - **Serde**: Configuration documents that could not be parsed
//!
//! None of these are retried or recovered inside the library. A failed export
//! leaves its staging file as it was and a new session has to be started.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout Flatfiles.
pub type Result<T> = std::result::Result<T, FfError>;

/// Canonical error enumeration for Flatfiles.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum FfError {
    /// Malformed field specification or driver configuration.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The destination exists and the caller did not ask to overwrite it.
    #[error("target export file already exists at: {path}")]
    AlreadyExists { path: String },

    /// The destination extension does not map to a known format.
    #[error("unsupported file type: .{extension}")]
    UnsupportedFormat { extension: String },

    /// A field transform returned an error while a row was rendered.
    #[error("transform for column '{column}' failed: {message}")]
    Transform { column: String, message: String },

    /// Operation not allowed in the current session state.
    #[error("invalid export state: {message}")]
    InvalidState { message: String },

    /// Errors originating from filesystem or storage IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style deserialization issues.
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<io::Error> for FfError {
    fn from(err: io::Error) -> Self {
        FfError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FfError {
    fn from(err: serde_json::Error) -> Self {
        FfError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for FfError {
    fn from(err: serde_yaml::Error) -> Self {
        FfError::Serde(err.to_string())
    }
}

impl From<tempfile::PersistError> for FfError {
    fn from(err: tempfile::PersistError) -> Self {
        FfError::Io(err.error.to_string())
    }
}

impl From<tempfile::PathPersistError> for FfError {
    fn from(err: tempfile::PathPersistError) -> Self {
        FfError::Io(err.error.to_string())
    }
}

impl FfError {
    /// Helper to construct configuration errors.
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        FfError::Configuration {
            message: message.into(),
        }
    }

    /// Helper to construct already-exists errors.
    pub fn already_exists<T: Into<String>>(path: T) -> Self {
        FfError::AlreadyExists { path: path.into() }
    }

    /// Helper to construct unsupported-format errors.
    pub fn unsupported_format<T: Into<String>>(extension: T) -> Self {
        FfError::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Wraps the error chain of a failed transform.
    pub fn transform(column: impl Into<String>, err: &anyhow::Error) -> Self {
        FfError::Transform {
            column: column.into(),
            message: format!("{:#}", err),
        }
    }

    /// Helper to construct state errors.
    pub fn invalid_state<T: Into<String>>(message: T) -> Self {
        FfError::InvalidState {
            message: message.into(),
        }
    }
}
