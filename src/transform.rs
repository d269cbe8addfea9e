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

//! # Transform Module
//!
//! Per-field transforms and the registry that resolves transforms named in
//! JSON/YAML field configuration.
//!
//! A transform receives the looked-up value (`null` when the path is missing)
//! and a read view of the whole record. Returning `Ok(None)` keeps the
//! looked-up value unchanged, so a transform that only handles some inputs can
//! pass the rest through. Returning `Ok(Some(Value::Null))` does the same,
//! which means a transform can never blank a cell by returning null; return
//! an empty string for that.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{FfError, Result};
use crate::record::FfRecordView;

/// Signature shared by every transform.
pub type FfTransformFn =
    dyn Fn(&Value, &FfRecordView<'_>) -> anyhow::Result<Option<Value>> + Send + Sync;

/// Cheaply clonable handle to a transform.
#[derive(Clone)]
pub struct FfTransform {
    label: Option<String>,
    func: Arc<FfTransformFn>,
}

impl FfTransform {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &FfRecordView<'_>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self {
            label: None,
            func: Arc::new(func),
        }
    }

    /// Transform with a default label, used when it is configured positionally.
    pub fn labeled<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &FfRecordView<'_>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self {
            label: Some(label.into()),
            func: Arc::new(func),
        }
    }

    /// Infallible transform over the value only.
    pub fn map<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self::new(move |value, _| Ok(func(value)))
    }

    /// Always yields `value`, whatever the record holds.
    pub fn constant(value: Value) -> Self {
        Self::new(move |_, _| Ok(Some(value.clone())))
    }

    /// Constant empty string.
    pub fn blank() -> Self {
        Self::constant(Value::String(String::new()))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn apply(&self, value: &Value, record: &FfRecordView<'_>) -> anyhow::Result<Option<Value>> {
        (self.func)(value, record)
    }

    /// Whether both handles point at the same function.
    pub fn same_as(&self, other: &FfTransform) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for FfTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfTransform")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Registry mapping transform names to transforms.
#[derive(Debug, Default, Clone)]
pub struct FfTransformRegistry {
    inner: HashMap<String, FfTransform>,
}

impl FfTransformRegistry {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Registry preloaded with `blank`, `upper`, `lower`, `trim`, `json` and `count`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("blank", FfTransform::blank());
        registry.register("upper", FfTransform::map(|v| v.as_str().map(|s| Value::String(s.to_uppercase()))));
        registry.register("lower", FfTransform::map(|v| v.as_str().map(|s| Value::String(s.to_lowercase()))));
        registry.register("trim", FfTransform::map(|v| v.as_str().map(|s| Value::String(s.trim().to_string()))));
        registry.register(
            "json",
            FfTransform::map(|v| match v {
                Value::Array(_) | Value::Object(_) => Some(Value::String(v.to_string())),
                _ => None,
            }),
        );
        registry.register(
            "count",
            FfTransform::map(|v| match v {
                Value::Array(items) => Some(Value::from(items.len())),
                Value::Object(map) => Some(Value::from(map.len())),
                Value::Null => Some(Value::from(0)),
                _ => None,
            }),
        );
        registry
    }

    pub fn register(&mut self, name: &str, transform: FfTransform) {
        self.inner.insert(name.to_string(), transform);
    }

    pub fn get(&self, name: &str) -> Result<FfTransform> {
        self.inner
            .get(name)
            .cloned()
            .ok_or_else(|| FfError::configuration(format!("unknown transform: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }
}
