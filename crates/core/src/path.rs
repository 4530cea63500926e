//! Path resolution for configuration values
//!
//! Paths in `.scuba.yml` are either absolute or explicitly relative (`./` or
//! `../`). Relative paths are anchored at a base directory, normally the
//! directory containing the configuration file.

use crate::errors::{ConfigError, ConfigResult, InternalError};
use crate::variable::expand_env_vars;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const RELATIVE_PREFIXES: [&str; 2] = ["./", "../"];

/// Expand environment variables in `path_str` and make the result absolute
///
/// Absolute paths are returned as-is. Relative paths must start with `./` or
/// `../` and are joined to `base_dir`; without a base directory they are
/// rejected.
pub fn resolve_absolute(path_str: &str, base_dir: Option<&Path>) -> ConfigResult<PathBuf> {
    let expanded = expand_env_vars(path_str)?;
    absolutize(&expanded, base_dir)
}

/// Make an already-expanded path string absolute
pub(crate) fn absolutize(path_str: &str, base_dir: Option<&Path>) -> ConfigResult<PathBuf> {
    if let Some(base) = base_dir {
        if !base.is_absolute() {
            return Err(InternalError::Generic {
                message: format!("base_dir is not absolute: {}", base.display()),
            }
            .into());
        }
    }

    let path = Path::new(path_str);
    if path.is_absolute() {
        return Ok(normalize(path));
    }

    let base = base_dir.ok_or_else(|| ConfigError::RelativePathNotAllowed {
        path: path_str.to_string(),
    })?;

    // Checked on the raw string; Path normalization would hide a leading "./"
    if !RELATIVE_PREFIXES.iter().any(|p| path_str.starts_with(p)) {
        return Err(ConfigError::InvalidRelativePath {
            path: path_str.to_string(),
        });
    }

    let resolved = normalize(&base.join(path));
    debug!("Resolved '{}' to {}", path_str, resolved.display());
    Ok(resolved)
}

/// Drop `.` components and trailing separators; `..` is kept
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
