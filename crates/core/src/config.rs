//! Configuration loading and discovery
//!
//! This module turns a `.scuba.yml` document into a [`ScubaConfig`]. The file
//! has a closed set of top-level keys:
//!
//! ```yaml
//! image: debian:12
//! shell: /bin/bash
//! entrypoint:            # null means "no entrypoint"
//! docker_args: --privileged -v /tmp:/tmp
//! environment:
//!   FOO: bar
//!   PASSTHROUGH:         # value taken from the host
//! volumes:
//!   /data: ./data
//! hooks:
//!   root: apt-get update
//!   user: { script: [id, pwd] }
//! aliases:
//!   build: make -j4
//!   test:
//!     image: rust:latest
//!     script: [cargo build, cargo test]
//! ```
//!
//! ## Discovery
//!
//! [`ConfigLoader::discover_config`] walks up from a starting directory until
//! it finds `.scuba.yml`, stopping at filesystem boundaries unless
//! `SCUBA_DISCOVERY_ACROSS_FILESYSTEM` is set.
//!
//! ## Scalars
//!
//! Documents are read as YAML 1.2. Environment values keep their YAML 1.2
//! spelling (`true`, `yes`, `42`), while an alias `root` flag also accepts
//! the YAML 1.1 words `yes`/`no`/`on`/`off`.

use crate::errors::{ConfigError, ConfigResult};
use crate::script::{flatten_script, process_script_node, ScriptEntry};
use crate::variable::parse_env_var;
use crate::volume::{parse_volumes, Volume};
use crate::yaml::{self, is_override, is_truthy, scalar_to_string, type_name, untagged, Overridable};
use crate::{DEFAULT_SHELL, SCUBA_YML};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Environment variable that allows discovery to cross mount points
pub const DISCOVERY_ACROSS_FILESYSTEM_VAR: &str = "SCUBA_DISCOVERY_ACROSS_FILESYSTEM";

const TOP_LEVEL_KEYS: [&str; 8] = [
    "image",
    "aliases",
    "hooks",
    "entrypoint",
    "environment",
    "shell",
    "docker_args",
    "volumes",
];

const ALIAS_KEYS: [&str; 8] = [
    "script",
    "image",
    "entrypoint",
    "environment",
    "shell",
    "root",
    "docker_args",
    "volumes",
];

/// Ordered environment mapping
pub type Environment = IndexMap<String, String>;

/// Volumes keyed by absolute container path
pub type Volumes = IndexMap<PathBuf, Volume>;

/// Hook scripts run by scubainit before the user command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookKind {
    /// Runs as root
    Root,
    /// Runs as the mapped host user
    User,
}

impl HookKind {
    pub const ALL: [HookKind; 2] = [HookKind::Root, HookKind::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Root => "root",
            HookKind::User => "user",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, reusable command definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub script: Vec<ScriptEntry>,
    pub image: Option<String>,
    /// `Some("")` means "no entrypoint"; `None` inherits
    pub entrypoint: Option<String>,
    pub environment: Environment,
    pub shell: Option<String>,
    pub as_root: bool,
    pub docker_args: Option<Overridable<Vec<String>>>,
    pub volumes: Option<Volumes>,
}

impl Alias {
    /// An alias with only a script
    pub fn new(name: impl Into<String>, script: Vec<ScriptEntry>) -> Self {
        Self {
            name: name.into(),
            script,
            image: None,
            entrypoint: None,
            environment: Environment::new(),
            shell: None,
            as_root: false,
            docker_args: None,
            volumes: None,
        }
    }

    fn from_node(name: &str, node: &Value, scuba_root: Option<&Path>) -> ConfigResult<Self> {
        let script = process_script_node(node, name)?;

        let Value::Mapping(map) = untagged(node) else {
            return Ok(Self::new(name, script));
        };

        for key in map.keys() {
            let known = key.as_str().map(|k| ALIAS_KEYS.contains(&k)).unwrap_or(false);
            if !known {
                debug!("Ignoring unknown key {:?} in alias '{}'", key, name);
            }
        }

        Ok(Self {
            name: name.to_string(),
            script,
            image: get_str(map, "image")?,
            entrypoint: get_nullable_str(map, "entrypoint")?.map(|e| e.value),
            environment: process_environment(map.get("environment"), &format!("{}.environment", name))?,
            shell: get_str(map, "shell")?,
            as_root: get_bool(map, "root")?,
            docker_args: get_docker_args(map)?,
            volumes: get_volumes(map, scuba_root)?,
        })
    }

    /// Script lines with nesting flattened
    pub fn lines(&self) -> Vec<String> {
        flatten_script(&self.script)
    }
}

/// Top-level scuba configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScubaConfig {
    image: Option<String>,
    pub shell: String,
    /// `Some("")` means "no entrypoint"; `None` uses the image's entrypoint
    pub entrypoint: Option<String>,
    pub docker_args: Option<Vec<String>>,
    pub volumes: Option<Volumes>,
    pub aliases: IndexMap<String, Alias>,
    pub hooks: IndexMap<HookKind, Vec<String>>,
    pub environment: Environment,
}

impl Default for ScubaConfig {
    fn default() -> Self {
        Self {
            image: None,
            shell: DEFAULT_SHELL.to_string(),
            entrypoint: None,
            docker_args: None,
            volumes: None,
            aliases: IndexMap::new(),
            hooks: IndexMap::new(),
            environment: Environment::new(),
        }
    }
}

impl ScubaConfig {
    /// Build a configuration from a resolved YAML document
    ///
    /// Relative volume host paths are anchored at `scuba_root`.
    pub fn from_value(data: &Value, scuba_root: Option<&Path>) -> ConfigResult<Self> {
        let map = match untagged(data) {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(map) => map,
            other => {
                return Err(ConfigError::validation(format!(
                    "{}: must be a mapping, not {}",
                    SCUBA_YML,
                    type_name(other)
                )))
            }
        };

        check_top_level_keys(map)?;

        Ok(Self {
            image: get_str(map, "image")?,
            shell: get_str(map, "shell")?.unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            entrypoint: get_nullable_str(map, "entrypoint")?.map(|e| e.value),
            docker_args: get_docker_args(map)?.map(|a| a.value),
            volumes: get_volumes(map, scuba_root)?,
            aliases: load_aliases(map, scuba_root)?,
            hooks: load_hooks(map)?,
            environment: process_environment(map.get("environment"), "environment")?,
        })
    }

    /// The top-level image; an error when it was never configured
    pub fn image(&self) -> ConfigResult<&str> {
        self.image.as_deref().ok_or(ConfigError::ImageNotSet)
    }

    pub fn image_opt(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

fn check_top_level_keys(map: &Mapping) -> ConfigResult<()> {
    let extra: Vec<String> = map
        .keys()
        .filter(|k| !k.as_str().map(|k| TOP_LEVEL_KEYS.contains(&k)).unwrap_or(false))
        .map(|k| scalar_to_string(k).unwrap_or_else(|| format!("{:?}", k)))
        .collect();

    if extra.is_empty() {
        return Ok(());
    }
    Err(ConfigError::validation(format!(
        "{}: Unrecognized node{}: {}",
        SCUBA_YML,
        if extra.len() > 1 { "s" } else { "" },
        extra.join(", ")
    )))
}

/// Optional string; null counts as absent
fn get_str(map: &Mapping, key: &str) -> ConfigResult<Option<String>> {
    match map.get(key).map(untagged) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigError::validation(format!(
            "'{}' must be a string, not {}",
            key,
            type_name(other)
        ))),
    }
}

/// Optional boolean; null counts as false
///
/// The YAML 1.1 boolean words (`yes`, `no`, `on`, `off`, `y`, `n`) arrive as
/// strings from a YAML 1.2 parser and are read as booleans here.
fn get_bool(map: &Mapping, key: &str) -> ConfigResult<bool> {
    let value = match map.get(key).map(untagged) {
        None | Some(Value::Null) => return Ok(false),
        Some(Value::Bool(b)) => return Ok(*b),
        Some(value) => value,
    };

    if let Value::String(s) = value {
        match s.to_ascii_lowercase().as_str() {
            "y" | "yes" | "on" | "true" => return Ok(true),
            "n" | "no" | "off" | "false" => return Ok(false),
            _ => {}
        }
    }
    Err(ConfigError::validation(format!(
        "'{}' must be a boolean, not {}",
        key,
        type_name(value)
    )))
}

/// Optional string where an explicit null is the empty string
///
/// "a mapping entry with some key and a null value is valid and different from
/// not having that key in the mapping" - <http://yaml.org/type/null.html>
fn get_nullable_str(map: &Mapping, key: &str) -> ConfigResult<Option<Overridable<String>>> {
    let Some(value) = map.get(key) else {
        return Ok(None);
    };
    let overriding = is_override(value);

    let s = match untagged(value) {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => {
            return Err(ConfigError::validation(format!(
                "'{}' must be a string, not {}",
                key,
                type_name(other)
            )))
        }
    };

    Ok(Some(Overridable {
        value: s,
        is_override: overriding,
    }))
}

fn get_docker_args(map: &Mapping) -> ConfigResult<Option<Overridable<Vec<String>>>> {
    let Some(args) = get_nullable_str(map, "docker_args")? else {
        return Ok(None);
    };
    let split = shell_words::split(&args.value)
        .map_err(|e| ConfigError::validation(format!("'docker_args': {}", e)))?;
    Ok(Some(args.map(|_| split)))
}

fn get_volumes(map: &Mapping, scuba_root: Option<&Path>) -> ConfigResult<Option<Volumes>> {
    match map.get("volumes").map(untagged) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(volumes)) => parse_volumes(volumes, scuba_root).map(Some),
        Some(other) => Err(ConfigError::validation(format!(
            "'volumes' must be a mapping, not {}",
            type_name(other)
        ))),
    }
}

/// Optional mapping section; null counts as absent
fn get_section<'a>(map: &'a Mapping, key: &str) -> ConfigResult<Option<&'a Mapping>> {
    match map.get(key).map(untagged) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(section)) => Ok(Some(section)),
        Some(other) => Err(ConfigError::validation(format!(
            "'{}' must be a mapping, not {}",
            key,
            type_name(other)
        ))),
    }
}

fn load_aliases(map: &Mapping, scuba_root: Option<&Path>) -> ConfigResult<IndexMap<String, Alias>> {
    let mut aliases = IndexMap::new();
    let Some(section) = get_section(map, "aliases")? else {
        return Ok(aliases);
    };

    for (key, node) in section {
        let name = scalar_to_string(key).ok_or_else(|| {
            ConfigError::validation(format!("Alias names must be strings, not {}", type_name(key)))
        })?;
        if name.contains(' ') {
            return Err(ConfigError::validation("Alias names cannot contain spaces"));
        }
        let alias = Alias::from_node(&name, node, scuba_root)?;
        aliases.insert(name, alias);
    }
    Ok(aliases)
}

fn load_hooks(map: &Mapping) -> ConfigResult<IndexMap<HookKind, Vec<String>>> {
    let mut hooks = IndexMap::new();
    let Some(section) = get_section(map, "hooks")? else {
        return Ok(hooks);
    };

    for key in section.keys() {
        if !matches!(key.as_str(), Some("user") | Some("root")) {
            warn!("Ignoring unknown hook {:?}", key);
        }
    }

    for kind in [HookKind::User, HookKind::Root] {
        if let Some(node) = section.get(kind.as_str()).filter(|n| is_truthy(n)) {
            let script = process_script_node(node, kind.as_str())?;
            hooks.insert(kind, flatten_script(&script));
        }
    }
    Ok(hooks)
}

/// Parse an environment node (mapping or `KEY[=VALUE]` list)
///
/// Values left empty in a mapping, and bare keys in a list, are taken from the
/// host environment (or empty when unset there). Other scalars are rendered
/// as YAML 1.2 text: `FLAG: true` gives `true` and `B: yes` gives `yes`.
pub fn process_environment(node: Option<&Value>, name: &str) -> ConfigResult<Environment> {
    let mut result = Environment::new();
    let Some(node) = node.filter(|n| is_truthy(n)) else {
        return Ok(result);
    };

    match untagged(node) {
        Value::Mapping(map) => {
            for (key, value) in map {
                let key = scalar_to_string(key).ok_or_else(|| {
                    ConfigError::validation(format!("'{}' keys must be strings", name))
                })?;
                let value = match untagged(value) {
                    Value::Null => env::var(&key).unwrap_or_default(),
                    other => scalar_to_string(other).ok_or_else(|| {
                        ConfigError::validation(format!(
                            "{}.{}: must be a scalar, not {}",
                            name,
                            key,
                            type_name(other)
                        ))
                    })?,
                };
                result.insert(key, value);
            }
        }
        Value::Sequence(entries) => {
            for entry in entries {
                let entry = scalar_to_string(entry).ok_or_else(|| {
                    ConfigError::validation(format!(
                        "'{}' entries must be strings, not {}",
                        name,
                        type_name(entry)
                    ))
                })?;
                let (key, value) = parse_env_var(&entry);
                result.insert(key, value);
            }
        }
        other => {
            return Err(ConfigError::validation(format!(
                "'{}' must be list or mapping, not {}",
                name,
                type_name(other)
            )))
        }
    }
    Ok(result)
}

/// Result of a successful upward search for `.scuba.yml`
#[derive(Debug, Clone)]
pub struct DiscoveredConfig {
    /// Directory containing `.scuba.yml`
    pub top_path: PathBuf,
    /// Path from `top_path` back to the starting directory (empty when equal)
    pub top_rel: PathBuf,
    pub config: ScubaConfig,
}

/// Configuration loader and discovery
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `.scuba.yml` from `path`, anchoring relative paths at `scuba_root`
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_path(path: &Path, scuba_root: &Path) -> ConfigResult<ScubaConfig> {
        debug!("Loading scuba configuration from {}", path.display());
        let doc = yaml::load_document(path)?;
        ScubaConfig::from_value(&doc, Some(scuba_root))
    }

    /// Search `start` and its parents for `.scuba.yml`
    ///
    /// Unless `cross_fs` is set, the search stops at the first mount point.
    #[instrument(skip_all, fields(start = %start.display(), cross_fs))]
    pub fn discover_config(start: &Path, cross_fs: bool) -> ConfigResult<DiscoveredConfig> {
        let mut path = start.to_path_buf();

        loop {
            let candidate = path.join(SCUBA_YML);
            debug!("Checking {}", candidate.display());
            if candidate.exists() {
                let top_rel = start
                    .strip_prefix(&path)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                let config = Self::load_from_path(&candidate, &path)?;
                return Ok(DiscoveredConfig {
                    top_path: path,
                    top_rel,
                    config,
                });
            }

            if !cross_fs && is_mount(&path) {
                return Err(ConfigError::NotFound {
                    message: format!(
                        "{} not found here or any parent up to mount point {}\n\
                         Stopping at filesystem boundary ({} not set).",
                        SCUBA_YML,
                        path.display(),
                        DISCOVERY_ACROSS_FILESYSTEM_VAR
                    ),
                });
            }

            match path.parent() {
                Some(parent) => path = parent.to_path_buf(),
                None => {
                    return Err(ConfigError::NotFound {
                        message: format!("{} not found here or any parent directories", SCUBA_YML),
                    })
                }
            }
        }
    }
}

/// Load a configuration file
pub fn load_config(path: &Path, scuba_root: &Path) -> ConfigResult<ScubaConfig> {
    ConfigLoader::load_from_path(path, scuba_root)
}

/// Discover `.scuba.yml` starting at the current working directory
pub fn find_config() -> ConfigResult<DiscoveredConfig> {
    let cwd = env::current_dir().map_err(|e| ConfigError::Io {
        path: ".".to_string(),
        source: e,
    })?;
    let cross_fs = env::var_os(DISCOVERY_ACROSS_FILESYSTEM_VAR).is_some();
    ConfigLoader::discover_config(&cwd, cross_fs)
}

/// Whether `path` is a mount point (or the filesystem root)
#[cfg(unix)]
pub fn is_mount(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let (Ok(meta), Ok(parent)) = (std::fs::metadata(path), std::fs::metadata(path.join(".."))) else {
        return false;
    };
    meta.dev() != parent.dev() || meta.ino() == parent.ino()
}

#[cfg(not(unix))]
pub fn is_mount(path: &Path) -> bool {
    path.parent().is_none()
}
