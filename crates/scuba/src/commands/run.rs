//! Run command implementation
//!
//! Discovers `.scuba.yml`, prepares a [`ScubaDive`] and launches the container
//! (or prints the command line for `--dry-run`).

use anyhow::{Context, Result};
use scuba_core::config::{find_config, DiscoveredConfig, Environment, ScubaConfig};
use scuba_core::dive::{DiveOptions, ScubaDive};
use scuba_core::docker::CliRuntime;
use scuba_core::errors::{ConfigError, ScubaError};
use scuba_core::shell::format_cmdline;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Exit code reported for a dry run, which never starts a container
pub const DRY_RUN_EXIT_CODE: i32 = 42;

/// Width used when printing the docker command line
const CMDLINE_WIDTH: usize = 80;

/// Arguments for the run command
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Command (and arguments) to run in the container
    pub command: Vec<String>,
    /// Extra `docker run` arguments, already split
    pub docker_args: Vec<String>,
    /// Environment variables given with `-e`
    pub env: Environment,
    pub entrypoint: Option<String>,
    pub image: Option<String>,
    pub shell: Option<String>,
    pub dry_run: bool,
    pub root: bool,
    pub verbose: bool,
    pub keep_tempfiles: bool,
    /// scubainit location; defaults to next to the running executable
    pub scubainit_path: Option<PathBuf>,
    /// Path to docker executable
    pub docker_path: String,
}

/// Locate and load `.scuba.yml`
///
/// Without a config file, an `--image` override still allows running with an
/// empty configuration rooted at the current directory.
pub fn discover(image_override: Option<&str>) -> Result<DiscoveredConfig, ScubaError> {
    match find_config() {
        Ok(discovered) => Ok(discovered),
        Err(e) if e.is_not_found() && image_override.is_some() => {
            debug!("No {} found, using --image: {}", scuba_core::SCUBA_YML, e);
            let top_path = std::env::current_dir().map_err(|source| ConfigError::Io {
                path: ".".to_string(),
                source,
            })?;
            Ok(DiscoveredConfig {
                top_path,
                top_rel: PathBuf::new(),
                config: ScubaConfig::default(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Execute the run command, returning the container's exit code
#[instrument(skip_all, fields(command = ?args.command.first(), dry_run = args.dry_run))]
pub async fn execute(args: RunArgs) -> Result<i32> {
    let discovered = discover(args.image.as_deref())?;
    let scubainit_path = match args.scubainit_path {
        Some(path) => path,
        None => default_scubainit_path()?,
    };

    let options = DiveOptions {
        user_command: args.command,
        docker_args: args.docker_args,
        env: args.env,
        as_root: args.root,
        verbose: args.verbose,
        image_override: args.image,
        entrypoint_override: args.entrypoint,
        shell_override: args.shell,
        // A dry run leaves the scubadir behind for inspection
        keep_tempfiles: args.keep_tempfiles || args.dry_run,
        scubainit_path,
    };

    let runtime = CliRuntime::with_runtime_path(args.docker_path);
    let dive = ScubaDive::prepare(
        &discovered.config,
        &discovered.top_path,
        &discovered.top_rel,
        options,
        &runtime,
    )
    .await?;

    if args.verbose || args.dry_run {
        let cmdline = dive.docker_cmdline()?;
        println!("{}", dive);
        eprintln!("scuba: Docker command line:");
        println!("$ {}", format_cmdline(&cmdline, CMDLINE_WIDTH));
    }

    if args.dry_run {
        eprintln!("scuba: Temp files not cleaned up");
        return Ok(DRY_RUN_EXIT_CODE);
    }

    let code = dive.run(&runtime).await?;
    debug!("Container exited with {}", code);
    Ok(code)
}

/// `scubainit` installed alongside the scuba executable
fn default_scubainit_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the scuba executable")?;
    Ok(exe
        .parent()
        .map(|dir| dir.join("scubainit"))
        .unwrap_or_else(|| PathBuf::from("scubainit")))
}
