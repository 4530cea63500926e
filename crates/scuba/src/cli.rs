//! Command-line interface definition

use crate::commands::{list, run};
use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser};
use scuba_core::config::Environment;
use scuba_core::variable::parse_env_var;
use std::path::PathBuf;

/// Simple Container-Utilizing Build Apparatus
#[derive(Debug, Parser)]
#[command(
    name = "scuba",
    version,
    about = "Simple Container-Utilizing Build Apparatus",
    long_about = "Simple Container-Utilizing Build Apparatus\n\n\
                  Runs commands in a Docker container configured by the nearest .scuba.yml, \
                  with the project directory mounted and the host user recreated.",
    disable_version_flag = true,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Pass additional arguments to 'docker run' (shell-split, repeatable)
    #[arg(short = 'd', long = "docker-arg", value_name = "ARGS", allow_hyphen_values = true)]
    pub docker_arg: Vec<String>,

    /// Environment variables to pass to docker (KEY=VALUE, or KEY to use the host value)
    #[arg(short = 'e', long = "env", value_name = "KEY[=VAL]")]
    pub env: Vec<String>,

    /// Override the entrypoint (empty string disables it)
    #[arg(long, value_name = "EP", allow_hyphen_values = true)]
    pub entrypoint: Option<String>,

    /// List the aliases defined in .scuba.yml
    #[arg(long, hide = true)]
    pub list_aliases: bool,

    /// List long options, for shell completion
    #[arg(long, hide = true)]
    pub list_available_options: bool,

    /// Override Docker image
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<String>,

    /// Override the shell used in the container
    #[arg(long, value_name = "SHELL")]
    pub shell: Option<String>,

    /// Don't actually invoke docker; just print the docker cmdline
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Run container as root (don't create scubauser)
    #[arg(short = 'r', long)]
    pub root: bool,

    /// Be verbose
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Don't delete temporary files
    #[arg(long)]
    pub keep_tempfiles: bool,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Path to the scubainit binary
    #[arg(long, hide = true, env = "SCUBA_SCUBAINIT_PATH", value_name = "PATH")]
    pub scubainit_path: Option<PathBuf>,

    /// Path to docker executable
    #[arg(long, hide = true, env = "SCUBA_DOCKER_PATH", default_value = "docker")]
    pub docker_path: String,

    /// Command (and arguments) to run in the container
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Run the requested action, returning the process exit code
    pub async fn dispatch(self) -> Result<i32> {
        if self.list_available_options {
            println!("{}", list::available_options(&Self::command()).join("\n"));
            return Ok(0);
        }

        if self.verbose
            && std::env::var_os("SCUBA_LOG").is_none()
            && std::env::var_os("RUST_LOG").is_none()
        {
            std::env::set_var("RUST_LOG", "scuba=debug,scuba_core=debug");
        }
        scuba_core::logging::init(None)?;
        tracing::debug!("CLI initialized: {:?}", self);

        if self.list_aliases {
            let discovered = run::discover(self.image.as_deref())?;
            print!("{}", list::format_aliases(&discovered.config));
            return Ok(0);
        }

        run::execute(self.into_run_args()?).await
    }

    fn into_run_args(self) -> Result<run::RunArgs> {
        let docker_args = split_docker_args(&self.docker_arg)?;
        let env: Environment = self.env.iter().map(|e| parse_env_var(e)).collect();

        Ok(run::RunArgs {
            command: self.command,
            docker_args,
            env,
            entrypoint: self.entrypoint,
            image: self.image,
            shell: self.shell,
            dry_run: self.dry_run,
            root: self.root,
            verbose: self.verbose,
            keep_tempfiles: self.keep_tempfiles,
            scubainit_path: self.scubainit_path,
            docker_path: self.docker_path,
        })
    }
}

/// Shell-split each `-d` value and flatten them into one list
pub fn split_docker_args(values: &[String]) -> Result<Vec<String>> {
    let mut args = Vec::new();
    for value in values {
        let split = shell_words::split(value)
            .map_err(|e| anyhow::anyhow!("Invalid --docker-arg '{}': {}", value, e))?;
        args.extend(split);
    }
    Ok(args)
}
