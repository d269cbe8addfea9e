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

//! # Field Specification Module
//!
//! Export columns can be described in several shapes. This module accepts all
//! of them through [`FfFieldsInput`] and normalizes them once into an
//! immutable [`FfFieldSpecList`]; nothing downstream sees the raw shapes.
//!
//! | key        | value                 | column      | label            | transform |
//! |------------|-----------------------|-------------|------------------|-----------|
//! | path       | `"Label"`             | path        | `Label`          | -         |
//! | position   | `"name"`              | `name`      | `name`           | -         |
//! | path       | transform             | path        | path             | transform |
//! | position   | transform             | -           | transform label  | transform |
//! | any        | mapping               | `column` or path | `label` or column | `callback` |
//! | path       | `""`                  | -           | path             | blank     |
//!
//! Order follows insertion order and duplicates are kept.

use serde_json::{Map, Value};

use crate::errors::{FfError, Result};
use crate::record::{json_kind, FfFieldPath};
use crate::transform::{FfTransform, FfTransformRegistry};

/// Key of a raw field entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FfFieldKey {
    /// Dotted path naming the source column.
    Path(String),
    /// Positional entry without a column key.
    Position(usize),
}

impl From<&str> for FfFieldKey {
    fn from(value: &str) -> Self {
        FfFieldKey::Path(value.to_string())
    }
}

impl From<String> for FfFieldKey {
    fn from(value: String) -> Self {
        FfFieldKey::Path(value)
    }
}

impl From<usize> for FfFieldKey {
    fn from(value: usize) -> Self {
        FfFieldKey::Position(value)
    }
}

/// Explicit `column` / `label` / `callback` overrides.
#[derive(Clone, Debug, Default)]
pub struct FfFieldMapping {
    pub column: Option<String>,
    pub label: Option<String>,
    pub callback: Option<FfTransform>,
}

impl FfFieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn callback(mut self, callback: FfTransform) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Raw field value before normalization.
#[derive(Clone, Debug)]
pub enum FfFieldValue {
    Label(String),
    Transform(FfTransform),
    Mapping(FfFieldMapping),
}

impl From<&str> for FfFieldValue {
    fn from(value: &str) -> Self {
        FfFieldValue::Label(value.to_string())
    }
}

impl From<String> for FfFieldValue {
    fn from(value: String) -> Self {
        FfFieldValue::Label(value)
    }
}

impl From<FfTransform> for FfFieldValue {
    fn from(value: FfTransform) -> Self {
        FfFieldValue::Transform(value)
    }
}

impl From<FfFieldMapping> for FfFieldValue {
    fn from(value: FfFieldMapping) -> Self {
        FfFieldValue::Mapping(value)
    }
}

/// Ordered raw field configuration.
#[derive(Clone, Debug, Default)]
pub struct FfFieldsInput {
    entries: Vec<(FfFieldKey, FfFieldValue)>,
    next_position: usize,
}

impl FfFieldsInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry under an explicit key.
    pub fn field(mut self, key: impl Into<FfFieldKey>, value: impl Into<FfFieldValue>) -> Self {
        let key = key.into();
        if let FfFieldKey::Position(position) = key {
            self.next_position = self.next_position.max(position + 1);
        }
        self.entries.push((key, value.into()));
        self
    }

    /// Adds an entry under the next free position.
    pub fn positional(self, value: impl Into<FfFieldValue>) -> Self {
        let position = self.next_position;
        self.field(FfFieldKey::Position(position), value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses field configuration coming from a JSON or YAML document.
    ///
    /// Objects keep their document order and keys made of digits count as
    /// positions. Arrays are read as positional entries. `callback` names are
    /// looked up in `registry`.
    pub fn from_value(value: &Value, registry: &FfTransformRegistry) -> Result<Self> {
        let mut input = Self::new();
        match value {
            Value::Object(map) => {
                for (key, raw) in map {
                    let key = match key.parse::<usize>() {
                        Ok(position) => FfFieldKey::Position(position),
                        Err(_) => FfFieldKey::Path(key.clone()),
                    };
                    let parsed = parse_raw_value(&key, raw, registry)?;
                    input = input.field(key, parsed);
                }
            }
            Value::Array(items) => {
                for (position, raw) in items.iter().enumerate() {
                    let key = FfFieldKey::Position(position);
                    let parsed = parse_raw_value(&key, raw, registry)?;
                    input = input.field(key, parsed);
                }
            }
            other => {
                return Err(FfError::configuration(format!(
                    "field configuration must be an object or an array, got {}",
                    json_kind(other)
                )))
            }
        }
        Ok(input)
    }

    /// Normalizes every entry into the canonical field list.
    pub fn normalize(&self) -> Result<FfFieldSpecList> {
        let specs = self
            .entries
            .iter()
            .map(|(key, value)| normalize_entry(key, value))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("normalized {} export fields", specs.len());
        Ok(FfFieldSpecList { specs })
    }
}

/// Implemented by types that declare the columns of an export.
pub trait FfFields {
    fn fields(&self) -> FfFieldsInput;
}

/// Canonical column definition.
#[derive(Clone, Debug)]
pub struct FfFieldSpec {
    column: Option<FfFieldPath>,
    label: String,
    transform: Option<FfTransform>,
}

impl FfFieldSpec {
    pub fn new(column: Option<FfFieldPath>, label: impl Into<String>, transform: Option<FfTransform>) -> Self {
        Self {
            column,
            label: label.into(),
            transform,
        }
    }

    pub fn column(&self) -> Option<&FfFieldPath> {
        self.column.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn transform(&self) -> Option<&FfTransform> {
        self.transform.as_ref()
    }
}

impl PartialEq for FfFieldSpec {
    fn eq(&self, other: &Self) -> bool {
        let transforms_match = match (&self.transform, &other.transform) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_as(b),
            _ => false,
        };
        self.column == other.column && self.label == other.label && transforms_match
    }
}

/// Ordered, immutable list of columns for one export session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FfFieldSpecList {
    specs: Vec<FfFieldSpec>,
}

impl FfFieldSpecList {
    pub fn new(specs: Vec<FfFieldSpec>) -> Self {
        Self { specs }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FfFieldSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FfFieldSpec> {
        self.specs.get(index)
    }

    /// Header labels in column order.
    pub fn labels(&self) -> Vec<&str> {
        self.specs.iter().map(FfFieldSpec::label).collect()
    }

    /// Source columns in order; blank columns are skipped.
    pub fn columns(&self) -> Vec<&str> {
        self.specs
            .iter()
            .filter_map(|spec| spec.column().map(FfFieldPath::as_str))
            .collect()
    }
}

impl<'a> IntoIterator for &'a FfFieldSpecList {
    type Item = &'a FfFieldSpec;
    type IntoIter = std::slice::Iter<'a, FfFieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

fn normalize_entry(key: &FfFieldKey, value: &FfFieldValue) -> Result<FfFieldSpec> {
    match (key, value) {
        (FfFieldKey::Path(path), FfFieldValue::Label(label)) if label.is_empty() => {
            Ok(FfFieldSpec::new(None, path.clone(), Some(FfTransform::blank())))
        }
        (FfFieldKey::Position(_), FfFieldValue::Label(label)) if label.is_empty() => {
            Ok(FfFieldSpec::new(None, String::new(), Some(FfTransform::blank())))
        }
        (FfFieldKey::Path(path), FfFieldValue::Label(label)) => {
            Ok(FfFieldSpec::new(Some(FfFieldPath::parse(path)?), label.clone(), None))
        }
        (FfFieldKey::Position(_), FfFieldValue::Label(label)) => {
            Ok(FfFieldSpec::new(Some(FfFieldPath::parse(label)?), label.clone(), None))
        }
        (FfFieldKey::Path(path), FfFieldValue::Transform(transform)) => Ok(FfFieldSpec::new(
            Some(FfFieldPath::parse(path)?),
            path.clone(),
            Some(transform.clone()),
        )),
        (FfFieldKey::Position(position), FfFieldValue::Transform(transform)) => {
            let label = transform.label().ok_or_else(|| {
                FfError::configuration(format!(
                    "transform at position {} has no column and no default label",
                    position
                ))
            })?;
            Ok(FfFieldSpec::new(None, label, Some(transform.clone())))
        }
        (key, FfFieldValue::Mapping(mapping)) => normalize_mapping(key, mapping),
    }
}

fn normalize_mapping(key: &FfFieldKey, mapping: &FfFieldMapping) -> Result<FfFieldSpec> {
    let column = match (&mapping.column, key) {
        (Some(column), _) if !column.trim().is_empty() => Some(column.as_str()),
        (_, FfFieldKey::Path(path)) => Some(path.as_str()),
        (_, FfFieldKey::Position(_)) => None,
    };

    let label = match (&mapping.label, column) {
        (Some(label), _) => label.clone(),
        (None, Some(column)) => column.to_string(),
        (None, None) => {
            return Err(FfError::configuration(format!(
                "field {} needs a column or a label",
                describe_key(key)
            )))
        }
    };

    let transform = match (&mapping.callback, column) {
        (Some(callback), _) => Some(callback.clone()),
        (None, Some(_)) => None,
        (None, None) => Some(FfTransform::blank()),
    };

    let column = column.map(FfFieldPath::parse).transpose()?;
    Ok(FfFieldSpec::new(column, label, transform))
}

fn parse_raw_value(key: &FfFieldKey, raw: &Value, registry: &FfTransformRegistry) -> Result<FfFieldValue> {
    match raw {
        Value::String(label) => Ok(FfFieldValue::Label(label.clone())),
        Value::Object(map) => parse_mapping(key, map, registry).map(FfFieldValue::Mapping),
        other => Err(FfError::configuration(format!(
            "field {} must be a string or an object, got {}",
            describe_key(key),
            json_kind(other)
        ))),
    }
}

fn parse_mapping(key: &FfFieldKey, map: &Map<String, Value>, registry: &FfTransformRegistry) -> Result<FfFieldMapping> {
    let mut mapping = FfFieldMapping::new();
    for (name, value) in map {
        let text = value.as_str().ok_or_else(|| {
            FfError::configuration(format!(
                "'{}' of field {} must be a string, got {}",
                name,
                describe_key(key),
                json_kind(value)
            ))
        })?;
        match name.as_str() {
            "column" => mapping.column = Some(text.to_string()),
            "label" => mapping.label = Some(text.to_string()),
            "callback" => mapping.callback = Some(registry.get(text)?),
            other => {
                return Err(FfError::configuration(format!(
                    "unknown key '{}' in field {}",
                    other,
                    describe_key(key)
                )))
            }
        }
    }
    Ok(mapping)
}

fn describe_key(key: &FfFieldKey) -> String {
    match key {
        FfFieldKey::Path(path) => format!("'{}'", path),
        FfFieldKey::Position(position) => format!("at position {}", position),
    }
}
