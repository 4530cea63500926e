//! Environment variable expansion
//!
//! Strings in `.scuba.yml` (volume paths, volume names, container paths) may
//! reference host environment variables:
//!
//! - `$NAME` / `${NAME}` - replaced by the variable's value
//! - `$$` - a literal `$`
//!
//! Expansion is strict: referencing a variable that is not set is an error,
//! as is a `$` that does not start one of the forms above (e.g. a trailing `$`).

use crate::errors::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::env;
use tracing::{debug, instrument};

/// Placeholder pattern; the empty `invalid` alternative catches a bare `$`
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|(?P<named>[_a-zA-Z][_a-zA-Z0-9]*)|\{(?P<braced>[_a-zA-Z][_a-zA-Z0-9]*)\}|(?P<invalid>))",
    )
    .expect("Variable pattern regex should be valid")
});

/// Expand environment variable references using the process environment
///
/// ## Example
///
/// ```rust
/// use scuba_core::variable::expand_env_vars;
///
/// assert_eq!(expand_env_vars("cost: $$5").unwrap(), "cost: $5");
/// ```
pub fn expand_env_vars(input: &str) -> ConfigResult<String> {
    expand_vars_with(input, |name| {
        env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    })
}

/// Expand variable references using an arbitrary lookup function
#[instrument(skip_all, fields(input = %input))]
pub fn expand_vars_with<F>(input: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut last = 0;

    for caps in VARIABLE_PATTERN.captures_iter(input) {
        let whole = caps.get(0).expect("capture group 0 always matches");
        result.push_str(&input[last..whole.start()]);
        last = whole.end();

        result.push_str(&resolve_placeholder(&caps, input, &lookup)?);
    }
    result.push_str(&input[last..]);

    Ok(result)
}

fn resolve_placeholder<F>(caps: &Captures<'_>, input: &str, lookup: &F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    if caps.name("escaped").is_some() {
        return Ok("$".to_string());
    }

    let name = match caps.name("named").or_else(|| caps.name("braced")) {
        Some(m) => m.as_str(),
        None => {
            return Err(ConfigError::MalformedReference {
                input: input.to_string(),
            })
        }
    };

    match lookup(name) {
        Some(value) => {
            debug!("Expanded ${} to '{}'", name, value);
            Ok(value)
        }
        None => Err(ConfigError::UnsetVariable {
            name: name.to_string(),
            input: input.to_string(),
        }),
    }
}

/// Parse a `KEY` or `KEY=VALUE` environment entry
///
/// Follows `docker run -e` semantics: a bare `KEY` takes the value of the host
/// variable of that name, or the empty string when it is unset.
pub fn parse_env_var(entry: &str) -> (String, String) {
    match entry.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => {
            let value = env::var_os(entry)
                .map(|v| v.to_string_lossy().into_owned())
                .unwrap_or_default();
            (entry.to_string(), value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_plain_string_unchanged() {
        let result = expand_vars_with("/no/vars/here", lookup_in(&[])).unwrap();
        assert_eq!(result, "/no/vars/here");
    }

    #[test]
    fn test_named_and_braced() {
        let lookup = lookup_in(&[("HOME", "/home/me"), ("SUB", "dir")]);
        let result = expand_vars_with("$HOME/${SUB}x/$SUB", lookup).unwrap();
        assert_eq!(result, "/home/me/dirx/dir");
    }

    #[test]
    fn test_escaped_dollar() {
        assert_eq!(expand_vars_with("$$", lookup_in(&[])).unwrap(), "$");
        assert_eq!(
            expand_vars_with("a$$b$$$$", lookup_in(&[])).unwrap(),
            "a$b$$"
        );
    }

    #[test]
    fn test_unset_variable_names_variable() {
        let err = expand_vars_with("/x/$MISSING_VAR/y", lookup_in(&[])).unwrap_err();
        match &err {
            ConfigError::UnsetVariable { name, input } => {
                assert_eq!(name, "MISSING_VAR");
                assert_eq!(input, "/x/$MISSING_VAR/y");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("MISSING_VAR"));
    }

    #[test]
    fn test_malformed_references() {
        for input in ["trailing $", "${unclosed", "$1abc", "${}"] {
            let err = expand_vars_with(input, lookup_in(&[("unclosed", "x")])).unwrap_err();
            assert!(
                matches!(err, ConfigError::MalformedReference { .. }),
                "{input}: {err:?}"
            );
        }
    }

    #[test]
    fn test_empty_value_is_set() {
        let result = expand_vars_with("[$EMPTY]", lookup_in(&[("EMPTY", "")])).unwrap();
        assert_eq!(result, "[]");
    }

    #[test]
    #[serial]
    fn test_expand_env_vars_uses_process_env() {
        env::set_var("SCUBA_TEST_EXPAND_VAR", "/bar/baz");
        assert_eq!(
            expand_env_vars("${SCUBA_TEST_EXPAND_VAR}/foo").unwrap(),
            "/bar/baz/foo"
        );
        env::remove_var("SCUBA_TEST_EXPAND_VAR");
        assert!(expand_env_vars("$SCUBA_TEST_EXPAND_VAR").is_err());
    }

    #[test]
    #[serial]
    fn test_parse_env_var() {
        assert_eq!(
            parse_env_var("KEY=VALUE"),
            ("KEY".to_string(), "VALUE".to_string())
        );
        assert_eq!(
            parse_env_var("KEY=a=b"),
            ("KEY".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_env_var("EMPTY="), ("EMPTY".to_string(), String::new()));

        env::set_var("SCUBA_TEST_PARSE_ENV", "Outside world");
        assert_eq!(
            parse_env_var("SCUBA_TEST_PARSE_ENV"),
            (
                "SCUBA_TEST_PARSE_ENV".to_string(),
                "Outside world".to_string()
            )
        );
        env::remove_var("SCUBA_TEST_PARSE_ENV");
        assert_eq!(
            parse_env_var("SCUBA_TEST_PARSE_ENV"),
            ("SCUBA_TEST_PARSE_ENV".to_string(), String::new())
        );
    }
}
