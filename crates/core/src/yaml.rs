//! YAML document loading with scuba's custom tags
//!
//! Documents are parsed into [`serde_yaml::Value`] and then walked once to
//! resolve the two supported tags:
//!
//! - `!from_yaml <file> <key.path>` is replaced by the value found at `key.path`
//!   in `file` (relative to the directory of the document being loaded).
//!   Dots inside a key segment are escaped as `\.`.
//! - `!override <scalar>` re-parses its scalar as YAML and keeps the result
//!   tagged so the model layer can apply replace semantics.
//!
//! Any other tag is rejected; nothing is ever constructed from a tag.

use crate::errors::{ConfigError, ConfigResult};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Tag marking a value for replace-not-merge semantics
pub const OVERRIDE_TAG: &str = "override";

/// Tag for cross-file key lookups
pub const FROM_YAML_TAG: &str = "from_yaml";

/// A configuration value that may carry the `!override` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overridable<T> {
    pub value: T,
    pub is_override: bool,
}

impl<T> Overridable<T> {
    /// An untagged value
    pub fn plain(value: T) -> Self {
        Self {
            value,
            is_override: false,
        }
    }

    /// A value tagged with `!override`
    pub fn overriding(value: T) -> Self {
        Self {
            value,
            is_override: true,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Overridable<U> {
        Overridable {
            value: f(self.value),
            is_override: self.is_override,
        }
    }
}

/// Load a YAML file and resolve its custom tags
///
/// Files referenced through `!from_yaml` are read at most once per call.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_document(path: &Path) -> ConfigResult<Value> {
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut loader = DocumentLoader::new(label);
    loader.load_file(path)
}

/// Parse YAML text and resolve its custom tags, relative to `root`
pub fn parse_document(text: &str, root: &Path, label: &str) -> ConfigResult<Value> {
    let mut loader = DocumentLoader::new(label.to_string());
    loader.parse(text, root)
}

/// Whether a value carries the `!override` marker
pub fn is_override(value: &Value) -> bool {
    matches!(value, Value::Tagged(tagged) if tagged.tag == OVERRIDE_TAG)
}

/// Strip any tag from a value
pub fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

/// YAML truthiness: null, false, zero and empty collections are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// Human-readable type name used in validation messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(tagged) => type_name(&tagged.value),
    }
}

/// Render a scalar as a string, as YAML would have written it
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match untagged(value) {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Load context for one top-level document
struct DocumentLoader {
    /// File name reported in error messages
    label: String,
    /// Resolved documents referenced via `!from_yaml`
    cache: HashMap<PathBuf, Value>,
}

impl DocumentLoader {
    fn new(label: String) -> Self {
        Self {
            label,
            cache: HashMap::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Parsing {
            file: self.label.clone(),
            message: message.into(),
        }
    }

    fn load_file(&mut self, path: &Path) -> ConfigResult<Value> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        self.parse(&text, root)
    }

    fn parse(&mut self, text: &str, root: &Path) -> ConfigResult<Value> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let raw: Value = serde_yaml::from_str(text).map_err(|e| self.error(e.to_string()))?;
        self.resolve(raw, root)
    }

    fn resolve(&mut self, value: Value, root: &Path) -> ConfigResult<Value> {
        match value {
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|item| self.resolve(item, root))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, item) in map {
                    let key = self.resolve(key, root)?;
                    resolved.insert(key, self.resolve(item, root)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Tagged(tagged) => self.resolve_tagged(*tagged, root),
            scalar => Ok(scalar),
        }
    }

    fn resolve_tagged(&mut self, tagged: TaggedValue, root: &Path) -> ConfigResult<Value> {
        if tagged.tag == FROM_YAML_TAG {
            self.from_yaml(&tagged.value, root)
        } else if tagged.tag == OVERRIDE_TAG {
            self.override_value(tagged.value, root)
        } else {
            Err(self.error(format!(
                "could not determine a constructor for the tag '{}'",
                tagged.tag
            )))
        }
    }

    fn from_yaml(&mut self, arg: &Value, root: &Path) -> ConfigResult<Value> {
        let content = match arg {
            Value::String(s) => s.as_str(),
            _ => return Err(self.error("Two arguments expected to !from_yaml")),
        };

        let parts = shell_words::split(content).map_err(|e| self.error(e.to_string()))?;
        let [filename, key] = parts.as_slice() else {
            return Err(self.error("Two arguments expected to !from_yaml"));
        };

        let path = root.join(filename);
        if !self.cache.contains_key(&path) {
            debug!("Loading {} for !from_yaml", path.display());
            let doc = self.load_file(&path)?;
            self.cache.insert(path.clone(), doc);
        }

        let mut current = &self.cache[&path];
        for segment in split_key(key) {
            current = match untagged(current) {
                Value::Mapping(map) => map.get(segment.as_str()),
                _ => None,
            }
            .ok_or_else(|| self.error(format!("Key '{}' not found in {}", key, filename)))?;
        }
        Ok(current.clone())
    }

    fn override_value(&mut self, inner: Value, root: &Path) -> ConfigResult<Value> {
        let value = match inner {
            Value::String(content) => self.parse(&content, root)?,
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
                return Err(self.error("!override expects a scalar value"));
            }
            scalar => scalar,
        };

        // A null result stays tagged: "override to empty"
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(OVERRIDE_TAG),
            value,
        })))
    }
}

/// Split a dotted key path; `\.` is a literal dot within a segment
fn split_key(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                chars.next();
                current.push('.');
            }
            '.' => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}
