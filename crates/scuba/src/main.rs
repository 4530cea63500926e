use anyhow::Result;
use clap::Parser;
use scuba_core::errors::{DockerError, ScubaError};

mod cli;
mod commands;

/// Exit code when the container runtime cannot be executed
const EXIT_RUNTIME_MISSING: i32 = 2;

/// Exit code for configuration, staging and runtime errors
const EXIT_SCUBA_ERROR: i32 = 128;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let parsed = cli::Cli::parse();

    match parsed.dispatch().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("scuba: {}", err);
            std::process::exit(exit_code(&err));
        }
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    let not_installed = matches!(
        err.downcast_ref::<ScubaError>(),
        Some(ScubaError::Docker(DockerError::NotInstalled))
    ) || matches!(err.downcast_ref::<DockerError>(), Some(DockerError::NotInstalled));

    if not_installed {
        EXIT_RUNTIME_MISSING
    } else {
        EXIT_SCUBA_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scuba_core::errors::ConfigError;

    #[test]
    fn test_exit_codes() {
        let err = anyhow::Error::from(ScubaError::Docker(DockerError::NotInstalled));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::from(ScubaError::Config(ConfigError::ImageNotSet));
        assert_eq!(exit_code(&err), 128);

        let err = anyhow::anyhow!("anything else");
        assert_eq!(exit_code(&err), 128);
    }
}
