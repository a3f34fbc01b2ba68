//! Feature schema reconciliation
//!
//! Aligns caller-supplied features with the ordered feature list a model was
//! trained on. When the model's schema is known the output has exactly those
//! columns in that order: missing features are filled with `0.0` and
//! unexpected ones are dropped. When it is unknown the input passes through
//! untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ServeError;

/// Value used for features the caller did not send
pub const FILL_VALUE: f64 = 0.0;

/// How to treat a payload that does not match the model's schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Fill missing features with zero and drop unexpected ones
    #[default]
    Fill,
    /// Reject any mismatch with [`ServeError::SchemaMismatch`]
    Strict,
}

/// Ordered feature mapping supplied with a request
///
/// Keeps the order of the JSON document. A repeated key keeps its first
/// position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePayload {
    entries: Vec<(String, f64)>,
    /// Position of each name in `entries`
    index: HashMap<String, usize>,
}

impl FeaturePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert<K: Into<String>>(&mut self, name: K, value: f64) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeaturePayload {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut payload = FeaturePayload::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

impl Serialize for FeaturePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeaturePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = FeaturePayload;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of feature names to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let hint = access.size_hint().unwrap_or(0).min(4096);
                let mut payload = FeaturePayload::with_capacity(hint);
                while let Some((name, value)) = access.next_entry::<String, f64>()? {
                    payload.insert(name, value);
                }
                Ok(payload)
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

/// Columns touched by reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// Expected features absent from the input, filled with [`FILL_VALUE`]
    pub filled: Vec<String>,
    /// Input features the model does not know, dropped
    pub dropped: Vec<String>,
}

impl SchemaReport {
    pub fn is_clean(&self) -> bool {
        self.filled.is_empty() && self.dropped.is_empty()
    }
}

/// Where an output column takes its values from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// Index into the input columns
    Input(usize),
    /// Not present in the input
    Fill,
}

/// Mapping from input columns to model columns
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    pub columns: Vec<String>,
    pub sources: Vec<ColumnSource>,
    pub report: SchemaReport,
}

/// Plan the model columns for a set of input column names
///
/// Shared by the per-request path and the batch path. Duplicate input names
/// resolve to their first occurrence.
pub fn plan_columns<S: AsRef<str>>(
    available: &[S],
    feature_names: Option<&[String]>,
    mode: SchemaMode,
) -> Result<ColumnPlan, ServeError> {
    let Some(names) = feature_names else {
        return Ok(ColumnPlan {
            columns: available.iter().map(|s| s.as_ref().to_string()).collect(),
            sources: (0..available.len()).map(ColumnSource::Input).collect(),
            report: SchemaReport::default(),
        });
    };

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(available.len());
    for (i, name) in available.iter().enumerate() {
        index.entry(name.as_ref()).or_insert(i);
    }

    let mut report = SchemaReport::default();
    let sources: Vec<ColumnSource> = names
        .iter()
        .map(|name| match index.get(name.as_str()) {
            Some(&i) => ColumnSource::Input(i),
            None => {
                report.filled.push(name.clone());
                ColumnSource::Fill
            }
        })
        .collect();

    let expected: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    for name in available.iter().map(|s| s.as_ref()) {
        if !expected.contains(name) && seen.insert(name) {
            report.dropped.push(name.to_string());
        }
    }

    if !report.is_clean() {
        match mode {
            SchemaMode::Strict => {
                return Err(ServeError::SchemaMismatch {
                    missing: report.filled,
                    unexpected: report.dropped,
                })
            }
            SchemaMode::Fill => tracing::warn!(
                filled = ?report.filled,
                dropped = ?report.dropped,
                "Feature schema mismatch; filling missing features with 0 and dropping unexpected ones"
            ),
        }
    }

    Ok(ColumnPlan {
        columns: names.to_vec(),
        sources,
        report,
    })
}

/// Single row ready for the estimator
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
    pub report: SchemaReport,
}

impl AlignedRow {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }
}

/// Align a request payload with the model's feature schema
pub fn align(
    payload: &FeaturePayload,
    feature_names: Option<&[String]>,
    mode: SchemaMode,
) -> Result<AlignedRow, ServeError> {
    let keys: Vec<&str> = payload.keys().collect();
    let plan = plan_columns(&keys, feature_names, mode)?;

    let values = plan
        .sources
        .iter()
        .map(|source| match source {
            ColumnSource::Input(i) => payload.entries[*i].1,
            ColumnSource::Fill => FILL_VALUE,
        })
        .collect();

    Ok(AlignedRow {
        columns: plan.columns,
        values,
        report: plan.report,
    })
}
