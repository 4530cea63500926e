//! Volume specification parsing
//!
//! A volume entry maps an absolute container path to either a host path (bind
//! mount) or a named volume. Two YAML shapes are accepted:
//!
//! ```yaml
//! volumes:
//!   /foo: foo-volume        # named volume
//!   /bar: /host/bar         # absolute host path
//!   /snap: ./snap           # host path relative to .scuba.yml
//!   /data:
//!     hostpath: $HOME/data
//!     options: ro,z
//!   /cache:
//!     name: cache-volume
//! ```

use crate::docker::make_vol_opt;
use crate::errors::{ConfigError, ConfigResult, Result};
use crate::path::absolutize;
use crate::variable::expand_env_vars;
use crate::yaml::{scalar_to_string, type_name, untagged};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Valid names for named volumes (same rule as the docker CLI)
pub static VOLUME_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]+$").expect("Volume name regex should be valid")
});

const HOST_PATH_PREFIXES: [&str; 3] = ["/", "./", "../"];

/// What a volume mounts into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    /// Absolute path on the host
    HostPath(PathBuf),
    /// Named docker volume
    Named(String),
}

/// A single volume mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Absolute path inside the container
    pub container_path: PathBuf,
    pub source: VolumeSource,
    /// Mount options such as `ro` or `z`
    pub options: Vec<String>,
}

impl Volume {
    pub fn host_path(&self) -> Option<&Path> {
        match &self.source {
            VolumeSource::HostPath(path) => Some(path),
            VolumeSource::Named(_) => None,
        }
    }

    pub fn volume_name(&self) -> Option<&str> {
        match &self.source {
            VolumeSource::Named(name) => Some(name),
            VolumeSource::HostPath(_) => None,
        }
    }

    /// Parse a volume node for `container_path`
    ///
    /// Relative host paths are anchored at `base_dir`.
    pub fn from_node(
        container_path: &Path,
        node: &Value,
        base_dir: Option<&Path>,
    ) -> ConfigResult<Self> {
        match untagged(node) {
            Value::String(spec) => Self::from_simple(container_path, spec, base_dir),
            Value::Mapping(map) => Self::from_mapping(container_path, map, base_dir),
            Value::Null => Self::from_mapping(container_path, &Mapping::new(), base_dir),
            _ => Err(ConfigError::validation(format!(
                "{}: must be string or dict",
                container_path.display()
            ))),
        }
    }

    fn from_simple(container_path: &Path, spec: &str, base_dir: Option<&Path>) -> ConfigResult<Self> {
        let expanded = expand_env_vars(spec)?;

        let source = if HOST_PATH_PREFIXES.iter().any(|p| expanded.starts_with(p)) {
            VolumeSource::HostPath(absolutize(&expanded, base_dir)?)
        } else if VOLUME_NAME_PATTERN.is_match(&expanded) {
            VolumeSource::Named(expanded)
        } else {
            return Err(ConfigError::InvalidVolumeName { name: expanded });
        };

        Ok(Self {
            container_path: container_path.to_path_buf(),
            source,
            options: Vec::new(),
        })
    }

    fn from_mapping(
        container_path: &Path,
        map: &Mapping,
        base_dir: Option<&Path>,
    ) -> ConfigResult<Self> {
        let hostpath = optional_str(map, "hostpath")?.filter(|s| !s.is_empty());
        let name = optional_str(map, "name")?.filter(|s| !s.is_empty());
        let options = optional_str(map, "options")?
            .filter(|s| !s.is_empty())
            .map(|s| s.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        let source = match (hostpath, name) {
            (Some(hostpath), None) => {
                VolumeSource::HostPath(absolutize(&expand_env_vars(hostpath)?, base_dir)?)
            }
            (None, Some(name)) => VolumeSource::Named(expand_env_vars(name)?),
            _ => {
                return Err(ConfigError::validation(format!(
                    "Volume {} must have exactly one of 'hostpath' or 'name' subkey",
                    container_path.display()
                )))
            }
        };

        Ok(Self {
            container_path: container_path.to_path_buf(),
            source,
            options,
        })
    }

    /// Render as a `--volume=` docker argument
    pub fn to_docker_arg(&self) -> Result<String> {
        make_vol_opt(&self.source, &self.container_path, &self.options)
    }
}

fn optional_str<'a>(map: &'a Mapping, key: &str) -> ConfigResult<Option<&'a str>> {
    match map.get(key).map(untagged) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ConfigError::validation(format!(
            "'{}' must be a string, not {}",
            key,
            type_name(other)
        ))),
    }
}

/// Parse a `volumes` mapping, keyed by absolute container path
///
/// Container paths are env-expanded and must be absolute.
#[instrument(skip_all)]
pub fn parse_volumes(
    map: &Mapping,
    base_dir: Option<&Path>,
) -> ConfigResult<IndexMap<PathBuf, Volume>> {
    let mut volumes = IndexMap::with_capacity(map.len());
    for (key, node) in map {
        let cpath_str = scalar_to_string(key).ok_or_else(|| {
            ConfigError::validation(format!(
                "Volume container path must be a string, not {}",
                type_name(key)
            ))
        })?;
        let cpath = absolutize(&expand_env_vars(&cpath_str)?, None)?;
        let volume = Volume::from_node(&cpath, node, base_dir)?;
        debug!("Volume {} -> {:?}", cpath.display(), volume.source);
        volumes.insert(cpath, volume);
    }
    Ok(volumes)
}
