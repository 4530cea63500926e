//! Alias resolution and context building
//!
//! Combines the loaded [`ScubaConfig`], the user's command line and any
//! command-line overrides into a [`ResolvedContext`]: the image, script,
//! entrypoint, shell, environment, docker arguments and volumes for one run.
//!
//! Each field is resolved independently:
//!
//! | field         | precedence                                           |
//! |---------------|------------------------------------------------------|
//! | `image`       | override > alias > top-level (error if unset)        |
//! | `entrypoint`  | override > alias > top-level (image default later)   |
//! | `shell`       | override > alias > top-level                         |
//! | `environment` | top-level, alias entries replace by key              |
//! | `volumes`     | top-level, alias entries replace by container path   |
//! | `docker_args` | top-level + alias, or alias alone when `!override`   |
//! | `as_root`     | override or alias                                    |

use crate::config::{Alias, Environment, ScubaConfig, Volumes};
use crate::errors::{ConfigError, ConfigResult};
use crate::shell::shell_quote_cmd;
use tracing::{debug, instrument};

/// Values given on the command line that beat `.scuba.yml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOverrides {
    pub image: Option<String>,
    pub shell: Option<String>,
    /// `Some("")` means "no entrypoint"
    pub entrypoint: Option<String>,
    pub as_root: bool,
}

/// Fully merged execution plan for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    pub image: String,
    /// `None` runs the image's default command
    pub script: Option<Vec<String>>,
    /// `None` falls through to the image entrypoint; `Some("")` disables it
    pub entrypoint: Option<String>,
    pub shell: String,
    pub environment: Environment,
    pub docker_args: Vec<String>,
    pub volumes: Volumes,
    pub as_root: bool,
}

impl ResolvedContext {
    /// Resolve `command` against `config`
    ///
    /// When the first word of `command` names an alias, the alias settings are
    /// merged over the top-level ones.
    #[instrument(skip_all, fields(command = ?command.first()))]
    pub fn resolve(
        config: &ScubaConfig,
        command: &[String],
        overrides: &ContextOverrides,
    ) -> ConfigResult<Self> {
        let alias = command.first().and_then(|name| config.aliases.get(name));
        if let Some(alias) = alias {
            debug!("Using alias '{}'", alias.name);
        }

        let script = resolve_script(command, alias)?;

        Ok(Self {
            image: resolve_image(config, alias, overrides)?,
            script,
            entrypoint: resolve_entrypoint(config, alias, overrides),
            shell: resolve_shell(config, alias, overrides),
            environment: merge_environment(config, alias),
            docker_args: merge_docker_args(config, alias),
            volumes: merge_volumes(config, alias),
            as_root: overrides.as_root || alias.map(|a| a.as_root).unwrap_or(false),
        })
    }
}

/// Build the script lines for `command`
///
/// Multi-line aliases accept no extra arguments; a single-line alias gets the
/// remaining words appended, shell-quoted.
pub fn resolve_script(command: &[String], alias: Option<&Alias>) -> ConfigResult<Option<Vec<String>>> {
    let Some((_, rest)) = command.split_first() else {
        return Ok(None);
    };

    let Some(alias) = alias else {
        return Ok(Some(vec![shell_quote_cmd(command)]));
    };

    let lines = alias.lines();
    if lines.len() > 1 {
        if !rest.is_empty() {
            return Err(ConfigError::validation(
                "Additional arguments not allowed with multi-line aliases",
            ));
        }
        return Ok(Some(lines));
    }

    let base = lines.into_iter().next().unwrap_or_default();
    let line = if rest.is_empty() {
        base
    } else {
        format!("{} {}", base, shell_quote_cmd(rest))
    };
    Ok(Some(vec![line]))
}

/// The image, falling back to the top-level image
pub fn resolve_image(
    config: &ScubaConfig,
    alias: Option<&Alias>,
    overrides: &ContextOverrides,
) -> ConfigResult<String> {
    let chosen = non_empty(overrides.image.as_deref())
        .or_else(|| alias.and_then(|a| non_empty(a.image.as_deref())));
    match chosen {
        Some(image) => Ok(image.to_string()),
        None => config.image().map(str::to_string),
    }
}

pub fn resolve_entrypoint(
    config: &ScubaConfig,
    alias: Option<&Alias>,
    overrides: &ContextOverrides,
) -> Option<String> {
    overrides
        .entrypoint
        .clone()
        .or_else(|| alias.and_then(|a| a.entrypoint.clone()))
        .or_else(|| config.entrypoint.clone())
}

pub fn resolve_shell(
    config: &ScubaConfig,
    alias: Option<&Alias>,
    overrides: &ContextOverrides,
) -> String {
    non_empty(overrides.shell.as_deref())
        .or_else(|| alias.and_then(|a| a.shell.as_deref()))
        .unwrap_or(config.shell.as_str())
        .to_string()
}

pub fn merge_environment(config: &ScubaConfig, alias: Option<&Alias>) -> Environment {
    let mut environment = config.environment.clone();
    if let Some(alias) = alias {
        environment.extend(alias.environment.clone());
    }
    environment
}

/// Top-level args followed by the alias args, unless the alias args are `!override`
pub fn merge_docker_args(config: &ScubaConfig, alias: Option<&Alias>) -> Vec<String> {
    let mut args = config.docker_args.clone().unwrap_or_default();
    match alias.and_then(|a| a.docker_args.as_ref()) {
        Some(alias_args) if alias_args.is_override => alias_args.value.clone(),
        Some(alias_args) => {
            args.extend(alias_args.value.iter().cloned());
            args
        }
        None => args,
    }
}

pub fn merge_volumes(config: &ScubaConfig, alias: Option<&Alias>) -> Volumes {
    let mut volumes = config.volumes.clone().unwrap_or_default();
    if let Some(alias_volumes) = alias.and_then(|a| a.volumes.as_ref()) {
        volumes.extend(alias_volumes.clone());
    }
    volumes
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
