//! Error types and handling
//!
//! Configuration problems are all reported through [`ConfigError`]; the
//! "configuration file not found" case is a distinguished variant so callers can
//! offer a fallback (e.g. `--image`). Runtime and staging failures are wrapped
//! alongside it in [`ScubaError`] for unified handling by the CLI.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Generic validation failure with a field-naming message
    #[error("{message}")]
    Validation { message: String },

    /// YAML syntax or tag failure
    #[error("Error loading {file}: {message}")]
    Parsing { file: String, message: String },

    /// Configuration file could not be read
    #[error("Error opening {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A referenced environment variable is not set
    #[error("Unset environment variable '{name}' used in '{input}'")]
    UnsetVariable { name: String, input: String },

    /// A `$` reference that is neither `$$`, `$NAME` nor `${NAME}`
    #[error("Unable to expand string '{input}' due to parsing errors")]
    MalformedReference { input: String },

    /// Relative path without an explicit `./` or `../` prefix
    #[error("Relative path must start with ./ or ../: {path}")]
    InvalidRelativePath { path: String },

    /// Relative path where only absolute paths are accepted
    #[error("Relative path not allowed: {path}")]
    RelativePathNotAllowed { path: String },

    /// Volume name does not match the allowed pattern
    #[error("Invalid volume name: '{name}'")]
    InvalidVolumeName { name: String },

    /// No image configured at top level (and nothing overrode it)
    #[error("Top-level 'image' not set")]
    ImageNotSet,

    /// Configuration file not found
    #[error("{message}")]
    NotFound { message: String },

    /// Programming error surfaced while loading configuration
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ConfigError {
    /// Shorthand for a [`ConfigError::Validation`] error
    pub fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation {
            message: message.into(),
        }
    }

    /// Whether this error means the configuration file could not be located
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

/// Container runtime errors
#[derive(Error, Debug)]
pub enum DockerError {
    /// Runtime binary could not be executed
    #[error("Failed to execute docker. Is it installed?")]
    NotInstalled,

    /// Image does not exist locally
    #[error("No such image: {image}")]
    NoSuchImage { image: String },

    /// Runtime CLI command error
    #[error("{0}")]
    CliError(String),
}

/// Internal/generic fallback errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Generic internal error
    #[error("Internal error: {message}")]
    Generic { message: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum ScubaError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Container runtime errors
    #[error(transparent)]
    Docker(#[from] DockerError),

    /// Failure while staging files for the container
    #[error("{message}")]
    Staging {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// DOCKER_HOST points at a remote daemon
    #[error("Remote docker not supported (DOCKER_HOST is set)")]
    RemoteDocker,

    /// No user command and the image has no default command
    #[error("No command given and no image-specified command")]
    NoCommand,

    /// Internal/generic errors
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ScubaError {
    pub(crate) fn staging(message: impl Into<String>, source: std::io::Error) -> Self {
        ScubaError::Staging {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Convenience type alias for Results with ScubaError
pub type Result<T> = std::result::Result<T, ScubaError>;

/// Results produced while loading and resolving configuration
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::UnsetVariable {
            name: "FOO".to_string(),
            input: "$FOO/bar".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Unset environment variable 'FOO' used in '$FOO/bar'"
        );

        let error = ConfigError::InvalidRelativePath {
            path: "foo".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Relative path must start with ./ or ../: foo"
        );

        assert_eq!(
            format!("{}", ConfigError::ImageNotSet),
            "Top-level 'image' not set"
        );

        let error = ConfigError::validation("Alias names cannot contain spaces");
        assert_eq!(format!("{}", error), "Alias names cannot contain spaces");
    }

    #[test]
    fn test_not_found_is_distinguished() {
        let error = ConfigError::NotFound {
            message: ".scuba.yml not found".to_string(),
        };
        assert!(error.is_not_found());
        assert!(!ConfigError::ImageNotSet.is_not_found());
    }

    #[test]
    fn test_docker_error_display() {
        assert_eq!(
            format!("{}", DockerError::NotInstalled),
            "Failed to execute docker. Is it installed?"
        );
        let error = DockerError::NoSuchImage {
            image: "busybox".to_string(),
        };
        assert_eq!(format!("{}", error), "No such image: busybox");
    }

    #[test]
    fn test_scuba_error_from_domain_errors() {
        let scuba_error: ScubaError = ConfigError::ImageNotSet.into();
        assert!(matches!(scuba_error, ScubaError::Config(_)));
        // Transparent wrapping keeps the message intact for the CLI
        assert_eq!(scuba_error.to_string(), "Top-level 'image' not set");

        let scuba_error: ScubaError = DockerError::NotInstalled.into();
        assert!(matches!(scuba_error, ScubaError::Docker(_)));

        let scuba_error: ScubaError = InternalError::Generic {
            message: "Test".to_string(),
        }
        .into();
        assert!(matches!(scuba_error, ScubaError::Internal(_)));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let config_error = ConfigError::Io {
            path: ".scuba.yml".to_string(),
            source: io_error,
        };
        assert!(config_error.source().is_some());

        let staging = ScubaError::staging(
            "Failed to write command.sh",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(staging.source().is_some());
    }
}
