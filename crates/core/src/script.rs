//! Script node parsing
//!
//! Aliases and hooks share one schema: either a bare string, or a mapping with
//! a `script` key holding a string or a (possibly nested) list of strings.

use crate::errors::{ConfigError, ConfigResult};
use crate::yaml::{is_truthy, scalar_to_string, untagged};
use serde_yaml::Value;

/// One step of a script; lists may nest and are flattened before use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEntry {
    Line(String),
    Nested(Vec<ScriptEntry>),
}

impl From<&str> for ScriptEntry {
    fn from(line: &str) -> Self {
        ScriptEntry::Line(line.to_string())
    }
}

/// Normalize a script node into an ordered list of entries
///
/// `name` identifies the node in error messages (e.g. the alias name).
pub fn process_script_node(node: &Value, name: &str) -> ConfigResult<Vec<ScriptEntry>> {
    match untagged(node) {
        Value::String(s) => Ok(vec![ScriptEntry::Line(s.clone())]),
        Value::Mapping(map) => {
            let script = map
                .get("script")
                .filter(|v| is_truthy(v))
                .ok_or_else(|| {
                    ConfigError::validation(format!("{}: must have a 'script' subkey", name))
                })?;

            match untagged(script) {
                Value::String(s) => Ok(vec![ScriptEntry::Line(s.clone())]),
                Value::Sequence(items) => script_entries(items, name),
                _ => Err(ConfigError::validation(format!(
                    "{}.script: must be a string or list",
                    name
                ))),
            }
        }
        _ => Err(ConfigError::validation(format!(
            "{}: must be string or dict",
            name
        ))),
    }
}

fn script_entries(items: &[Value], name: &str) -> ConfigResult<Vec<ScriptEntry>> {
    items
        .iter()
        .map(|item| match untagged(item) {
            Value::Sequence(nested) => script_entries(nested, name).map(ScriptEntry::Nested),
            other => scalar_to_string(other).map(ScriptEntry::Line).ok_or_else(|| {
                ConfigError::validation(format!(
                    "{}.script: entries must be strings or lists",
                    name
                ))
            }),
        })
        .collect()
}

/// Flatten nested script entries into shell lines, preserving order
pub fn flatten_script(entries: &[ScriptEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    for entry in entries {
        match entry {
            ScriptEntry::Line(line) => lines.push(line.clone()),
            ScriptEntry::Nested(nested) => lines.extend(flatten_script(nested)),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_string_node() {
        let entries = process_script_node(&yaml("make -j4"), "build").unwrap();
        assert_eq!(entries, vec![ScriptEntry::from("make -j4")]);
    }

    #[test]
    fn test_mapping_with_string_script() {
        let node = yaml("script: cat /etc/os-release\nimage: debian");
        let entries = process_script_node(&node, "os").unwrap();
        assert_eq!(entries, vec![ScriptEntry::from("cat /etc/os-release")]);
    }

    #[test]
    fn test_mapping_with_nested_list() {
        let node = yaml("script:\n  - echo one\n  - [echo two, echo three]\n  - 42\n");
        let entries = process_script_node(&node, "multi").unwrap();
        assert_eq!(
            entries,
            vec![
                ScriptEntry::from("echo one"),
                ScriptEntry::Nested(vec![
                    ScriptEntry::from("echo two"),
                    ScriptEntry::from("echo three"),
                ]),
                ScriptEntry::from("42"),
            ]
        );
        assert_eq!(
            flatten_script(&entries),
            vec!["echo one", "echo two", "echo three", "42"]
        );
    }

    #[test]
    fn test_missing_or_empty_script_subkey() {
        for text in ["image: debian", "script: ''", "script: []", "script: null"] {
            let err = process_script_node(&yaml(text), "myalias").unwrap_err();
            assert_eq!(err.to_string(), "myalias: must have a 'script' subkey");
        }
    }

    #[test]
    fn test_wrong_script_type() {
        let err = process_script_node(&yaml("script:\n  a: b\n"), "myalias").unwrap_err();
        assert_eq!(err.to_string(), "myalias.script: must be a string or list");

        let err = process_script_node(&yaml("script:\n  - ~\n"), "myalias").unwrap_err();
        assert!(err.to_string().starts_with("myalias.script:"));
    }

    #[test]
    fn test_wrong_node_type() {
        for text in ["[a, b]", "42", "~"] {
            let err = process_script_node(&yaml(text), "user").unwrap_err();
            assert_eq!(err.to_string(), "user: must be string or dict");
        }
    }
}
