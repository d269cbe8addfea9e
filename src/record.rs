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

//! # Flatfiles Record Module
//!
//! This module provides the record abstraction handed to an export session.
//! An [`FfRecord`] is an ordered attribute map (serde_json with
//! `preserve_order`) whose values may be nested objects, arrays, or arrays of
//! child records used for relation fan-out.
//!
//! Some attributes can be marked hidden. Hidden attributes are left out of
//! [`FfRecord::visible`], which is what a record looks like when serialized
//! for any other purpose, but the renderer reads them through
//! [`FfRecordView`]. Visibility is never toggled on the record itself.
//!
//! A view reads hidden attributes through any path, not only the configured
//! columns: transforms calling [`FfRecordView::lookup`] see them as well.
//! Records that carry values no export may read should leave them out of the
//! record rather than mark them hidden.
//!
//! ## Usage Example
//!
//! ```rust
//! use flatfiles::record::{FfFieldPath, FfRecord};
//! use serde_json::json;
//!
//! let record = FfRecord::from_value(json!({
//!     "name": "Ada",
//!     "address": {"city": "London"},
//!     "password": "secret"
//! }))?
//! .with_hidden(["password"]);
//!
//! let city = FfFieldPath::parse("address.city")?;
//! assert_eq!(record.view().get(&city), Some(&json!("London")));
//! assert!(!record.visible().contains_key("password"));
//! ```

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::errors::{FfError, Result};

/// Ordered attribute map of a single record.
pub type FfAttributes = Map<String, Value>;

/// One source item of an export.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FfRecord {
    attributes: FfAttributes,
    hidden: BTreeSet<String>,
}

impl FfRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from an attribute map.
    pub fn from_attributes(attributes: FfAttributes) -> Self {
        Self {
            attributes,
            hidden: BTreeSet::new(),
        }
    }

    /// Builds a record from a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_attributes(map)),
            other => Err(FfError::configuration(format!(
                "record must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Marks attributes as hidden from [`FfRecord::visible`].
    pub fn with_hidden<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Returns a top-level attribute regardless of visibility.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &FfAttributes {
        &self.attributes
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.contains(key)
    }

    /// Attributes with hidden keys removed, in their original order.
    pub fn visible(&self) -> FfAttributes {
        self.attributes
            .iter()
            .filter(|(key, _)| !self.hidden.contains(key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Read accessor used while rendering.
    pub fn view(&self) -> FfRecordView<'_> {
        FfRecordView {
            record: self,
            binding: None,
        }
    }
}

impl From<FfAttributes> for FfRecord {
    fn from(attributes: FfAttributes) -> Self {
        Self::from_attributes(attributes)
    }
}

/// Borrowed, read-only view over a record.
///
/// During relation fan-out the view carries one related item bound under an
/// alias. Lookups whose first segment is the alias resolve against that item;
/// the underlying record is never modified.
#[derive(Clone, Copy, Debug)]
pub struct FfRecordView<'a> {
    record: &'a FfRecord,
    binding: Option<(&'a str, &'a Value)>,
}

impl<'a> FfRecordView<'a> {
    /// Returns a view with `item` bound under `alias`.
    pub fn bind(record: &'a FfRecord, alias: &'a str, item: &'a Value) -> Self {
        Self {
            record,
            binding: Some((alias, item)),
        }
    }

    pub fn record(&self) -> &'a FfRecord {
        self.record
    }

    /// Resolves a parsed path, hidden attributes included.
    pub fn get(&self, path: &FfFieldPath) -> Option<&'a Value> {
        if let Some((alias, item)) = self.binding {
            if path.raw == alias {
                return Some(item);
            }
            if path.segments[0] == alias {
                return descend(item, &path.segments[1..]);
            }
        }
        path.resolve(&self.record.attributes)
    }

    /// Parses and resolves `path`. Invalid paths resolve to nothing.
    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        FfFieldPath::parse(path).ok().and_then(|p| self.get(&p))
    }
}

/// Dotted path into a record, e.g. `customer.address.city` or `items.0.sku`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FfFieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FfFieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let raw = path.trim();
        let segments: Vec<String> = raw
            .split('.')
            .map(|segment| segment.trim().to_string())
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.is_empty() {
            return Err(FfError::configuration("field path may not be empty"));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against an attribute map.
    ///
    /// A top-level key equal to the whole path wins over descending, so keys
    /// that contain dots stay addressable.
    pub fn resolve<'v>(&self, attributes: &'v FfAttributes) -> Option<&'v Value> {
        if let Some(value) = attributes.get(&self.raw) {
            return Some(value);
        }
        let first = attributes.get(&self.segments[0])?;
        descend(first, &self.segments[1..])
    }
}

impl std::fmt::Display for FfFieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn descend<'v>(start: &'v Value, segments: &[String]) -> Option<&'v Value> {
    let mut current = start;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
