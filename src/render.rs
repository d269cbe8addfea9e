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

//! # Row Renderer Module
//!
//! Turns one record into output rows according to a normalized field list.
//!
//! ## Cell Values
//!
//! Each cell is looked up by its dotted column path (a missing path is null,
//! never an error), then passed through the field transform if there is one.
//! A transform result of `None` or `null` keeps the looked-up value. The
//! resulting JSON value is stringified:
//!
//! - strings verbatim, numbers in their JSON form
//! - `true` as `1`, `false` as an empty string
//! - arrays and objects as compact JSON
//! - null stays a null cell, which the encoder writes as an empty field
//!
//! ## Relation Fan-out
//!
//! [`FfRenderer::render_for_each_relation`] emits one row per related item,
//! with the item readable under an alias. Each relation path contributes its
//! own rows; they are concatenated, not crossed. When no path yields any item
//! the record still produces exactly one row.

use serde_json::Value;

use crate::errors::{FfError, Result};
use crate::fields::FfFieldSpecList;
use crate::record::{FfFieldPath, FfRecord, FfRecordView};

/// One output line. `None` is a null cell.
pub type FfRow = Vec<Option<String>>;

static NULL: Value = Value::Null;

/// Renders records against a borrowed field list.
#[derive(Debug, Clone, Copy)]
pub struct FfRenderer<'f> {
    fields: &'f FfFieldSpecList,
}

impl<'f> FfRenderer<'f> {
    pub fn new(fields: &'f FfFieldSpecList) -> Self {
        Self { fields }
    }

    /// Header row made of the field labels.
    pub fn header(&self) -> FfRow {
        self.fields
            .iter()
            .map(|spec| Some(spec.label().to_string()))
            .collect()
    }

    /// Renders a record into its single row.
    pub fn render(&self, record: &FfRecord) -> Result<Vec<FfRow>> {
        Ok(vec![self.render_view(&record.view())?])
    }

    /// Renders one row from a view, bound or not.
    pub fn render_view(&self, view: &FfRecordView<'_>) -> Result<FfRow> {
        let mut row = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let value = spec.column().and_then(|column| view.get(column)).unwrap_or(&NULL);

            let cell = match spec.transform() {
                Some(transform) => match transform.apply(value, view) {
                    Ok(Some(result)) if !result.is_null() => cell_text(&result),
                    Ok(_) => cell_text(value),
                    Err(err) => return Err(FfError::transform(spec.label(), &err)),
                },
                None => cell_text(value),
            };
            row.push(cell);
        }
        Ok(row)
    }

    /// Renders one row per related item found under `relation_paths`.
    pub fn render_for_each_relation(
        &self,
        record: &FfRecord,
        relation_paths: &[&str],
        alias: &str,
    ) -> Result<Vec<FfRow>> {
        let alias = alias.trim();
        if alias.is_empty() || alias.contains('.') {
            return Err(FfError::configuration(format!(
                "relation alias '{}' must be a plain attribute name",
                alias
            )));
        }

        let mut rows = Vec::new();
        for relation in relation_paths {
            let path = FfFieldPath::parse(relation)?;
            for item in related_items(record.view().get(&path)) {
                let view = FfRecordView::bind(record, alias, item);
                rows.push(self.render_view(&view)?);
            }
        }

        if rows.is_empty() {
            rows.push(self.render_view(&record.view())?);
        }
        Ok(rows)
    }
}

fn related_items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

/// Stringifies a JSON value into a cell.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
