//! Read/merge access to the `meta.json` record stored beside a compiled dictionary.
//!
//! The compiler historically writes the record as a JSON array of `[key, value]`
//! pairs; newer tooling writes a plain object. Both are accepted, and updates are
//! written back in the layout that was read.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};
use crate::util::write_atomic;

pub const META_FILE_NAME: &str = "meta.json";

pub const FORMAT_VERSION_KEY: &str = "format_version";
pub const SOURCE_REVISION_KEY: &str = "source_revision";
pub const CORPUS_REVISION_KEY: &str = "corpus_revision";

pub fn meta_path(out_dir: &Path) -> PathBuf {
    out_dir.join(META_FILE_NAME)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Object,
    Pairs,
}

/// Ordered key-value metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    entries: Vec<(String, Value)>,
    layout: Layout,
}

impl Default for MetaRecord {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            layout: Layout::Object,
        }
    }
}

impl MetaRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn merge(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            self.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Revision-like values are opaque: numbers and strings are rendered verbatim.
    pub fn token(&self, key: &str) -> Option<RevisionToken> {
        self.get(key).and_then(RevisionToken::from_value)
    }

    fn parse(path: &Path, raw: &[u8]) -> Result<Self> {
        let corrupt = |message: String| PipelineError::MetadataCorrupt {
            path: path.to_path_buf(),
            message,
        };

        let value: Value =
            serde_json::from_slice(raw).map_err(|err| corrupt(err.to_string()))?;

        match value {
            Value::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
                layout: Layout::Object,
            }),
            Value::Array(items) => {
                let mut record = Self {
                    entries: Vec::with_capacity(items.len()),
                    layout: Layout::Pairs,
                };
                for (index, item) in items.into_iter().enumerate() {
                    let Value::Array(mut pair) = item else {
                        return Err(corrupt(format!("entry {index} is not a [key, value] pair")));
                    };
                    if pair.len() != 2 {
                        return Err(corrupt(format!(
                            "entry {index} has {} elements, expected 2",
                            pair.len()
                        )));
                    }
                    let value = pair.pop().unwrap_or(Value::Null);
                    let Some(Value::String(key)) = pair.pop() else {
                        return Err(corrupt(format!("entry {index} has a non-string key")));
                    };
                    record.insert(key, value);
                }
                Ok(record)
            }
            other => Err(corrupt(format!(
                "expected an object or an array of pairs, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn to_json(&self) -> Value {
        match self.layout {
            Layout::Object => Value::Object(self.entries.iter().cloned().collect()),
            Layout::Pairs => Value::Array(
                self.entries
                    .iter()
                    .map(|(key, value)| Value::Array(vec![Value::String(key.clone()), value.clone()]))
                    .collect(),
            ),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Opaque upstream revision identifier (integer or string).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.trim().to_string())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn read(path: &Path) -> Result<MetaRecord> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PipelineError::MetadataMissing {
                path: path.to_path_buf(),
                detail: "file does not exist".to_string(),
            });
        }
        Err(err) => return Err(PipelineError::io(path, err)),
    };

    MetaRecord::parse(path, &raw)
}

/// Merges `partial` into the record at `path`, creating it when absent.
/// Keys not mentioned in `partial` are preserved.
pub fn update(path: &Path, partial: &Map<String, Value>) -> Result<MetaRecord> {
    let mut record = match read(path) {
        Ok(record) => record,
        Err(PipelineError::MetadataMissing { .. }) => MetaRecord::default(),
        Err(err) => return Err(err),
    };

    record.merge(partial);

    let mut data = serde_json::to_vec_pretty(&record.to_json()).map_err(|err| {
        PipelineError::MetadataCorrupt {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    data.push(b'\n');
    write_atomic(path, &data)?;

    Ok(record)
}
