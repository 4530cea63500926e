//! Container runtime integration
//!
//! scuba needs very little from the runtime: the default command and
//! entrypoint of an image (pulling it if necessary), and a way to launch
//! `docker run` with inherited stdio. [`ContainerRuntime`] abstracts those so
//! the staging logic can be tested against [`mock::MockRuntime`].

use crate::errors::{DockerError, InternalError, Result};
use crate::volume::VolumeSource;
use serde::Deserialize;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::{debug, instrument};

/// Default command and entrypoint recorded in an image
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageConfig {
    #[serde(rename = "Cmd")]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "Entrypoint")]
    pub entrypoint: Option<Vec<String>>,
}

impl ImageConfig {
    pub fn new(cmd: Option<Vec<String>>, entrypoint: Option<Vec<String>>) -> Self {
        Self { cmd, entrypoint }
    }
}

#[derive(Debug, Deserialize)]
struct ImageInspect {
    #[serde(rename = "Config")]
    config: ImageConfig,
}

/// Container runtime abstraction
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// Program name shown as the first word of generated command lines
    fn program(&self) -> &str;

    /// Inspect a local image; `None` when the image does not exist locally
    async fn inspect_image(&self, image: &str) -> Result<Option<ImageConfig>>;

    /// Pull an image from its registry
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Run the runtime with `args` (not including the program name), returning its exit code
    async fn run(&self, args: &[String]) -> Result<i32>;
}

/// Inspect an image, pulling it first if it does not exist locally
#[instrument(skip(runtime))]
pub async fn inspect_or_pull<R: ContainerRuntime>(runtime: &R, image: &str) -> Result<ImageConfig> {
    if let Some(config) = runtime.inspect_image(image).await? {
        return Ok(config);
    }

    debug!("Image {} not present locally, pulling", image);
    runtime.pull_image(image).await?;
    runtime
        .inspect_image(image)
        .await?
        .ok_or_else(|| {
            DockerError::NoSuchImage {
                image: image.to_string(),
            }
            .into()
        })
}

/// Default command of an image
pub async fn get_image_command<R: ContainerRuntime>(
    runtime: &R,
    image: &str,
) -> Result<Option<Vec<String>>> {
    Ok(inspect_or_pull(runtime, image).await?.cmd)
}

/// Entrypoint of an image
pub async fn get_image_entrypoint<R: ContainerRuntime>(
    runtime: &R,
    image: &str,
) -> Result<Option<Vec<String>>> {
    Ok(inspect_or_pull(runtime, image).await?.entrypoint)
}

/// Build a `--volume=SRC:DST[:opts]` argument
///
/// Host and container paths must be absolute.
pub fn make_vol_opt(
    source: &VolumeSource,
    container_path: &Path,
    options: &[String],
) -> Result<String> {
    let source = match source {
        VolumeSource::HostPath(host) => {
            if !host.is_absolute() {
                return Err(InternalError::Generic {
                    message: format!("hostdir not absolute: {}", host.display()),
                }
                .into());
            }
            host.display().to_string()
        }
        VolumeSource::Named(name) => name.clone(),
    };
    if !container_path.is_absolute() {
        return Err(InternalError::Generic {
            message: format!("contdir not absolute: {}", container_path.display()),
        }
        .into());
    }

    let mut vol = format!("--volume={}:{}", source, container_path.display());
    if !options.is_empty() {
        vol.push(':');
        vol.push_str(&options.join(","));
    }
    Ok(vol)
}

/// Parse the JSON printed by `docker inspect --type image`
fn parse_inspect_output(stdout: &str) -> Result<ImageConfig> {
    let images: Vec<ImageInspect> = serde_json::from_str(stdout).map_err(|e| {
        DockerError::CliError(format!("Failed to inspect image: {}", e))
    })?;
    images
        .into_iter()
        .next()
        .map(|i| i.config)
        .ok_or_else(|| DockerError::CliError("Failed to inspect image: empty output".to_string()).into())
}

fn spawn_error(e: io::Error) -> DockerError {
    if e.kind() == io::ErrorKind::NotFound {
        DockerError::NotInstalled
    } else {
        DockerError::CliError(format!("Failed to execute docker: {}", e))
    }
}

/// Runtime implementation that shells out to the docker CLI
#[derive(Debug, Clone)]
pub struct CliRuntime {
    /// Runtime CLI binary path
    runtime_path: String,
}

impl CliRuntime {
    pub fn docker() -> Self {
        Self {
            runtime_path: "docker".to_string(),
        }
    }

    /// Create a CliRuntime with a custom binary path
    pub fn with_runtime_path(runtime_path: String) -> Self {
        Self { runtime_path }
    }
}

impl Default for CliRuntime {
    fn default() -> Self {
        Self::docker()
    }
}

impl ContainerRuntime for CliRuntime {
    fn program(&self) -> &str {
        &self.runtime_path
    }

    #[instrument(skip(self))]
    async fn inspect_image(&self, image: &str) -> Result<Option<ImageConfig>> {
        debug!("Inspecting image: {}", image);

        let runtime_path = self.runtime_path.clone();
        let image = image.to_string();

        tokio::task::spawn_blocking(move || {
            let output = Command::new(&runtime_path)
                .args(["inspect", "--type", "image", &image])
                .output()
                .map_err(spawn_error)?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if stderr.to_lowercase().contains("no such image") {
                    return Ok(None);
                }
                return Err(DockerError::CliError(format!(
                    "Failed to inspect image: {}",
                    stderr.trim()
                ))
                .into());
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            parse_inspect_output(&stdout).map(Some)
        })
        .await
        .map_err(|e| DockerError::CliError(format!("Task join error: {}", e)))?
    }

    #[instrument(skip(self))]
    async fn pull_image(&self, image: &str) -> Result<()> {
        let runtime_path = self.runtime_path.clone();
        let image = image.to_string();

        tokio::task::spawn_blocking(move || {
            // The runtime's own progress output goes straight to the user
            let status = Command::new(&runtime_path)
                .args(["pull", &image])
                .status()
                .map_err(spawn_error)?;

            if !status.success() {
                return Err(DockerError::CliError(format!("Failed to pull image: {}", image)).into());
            }
            Ok(())
        })
        .await
        .map_err(|e| DockerError::CliError(format!("Task join error: {}", e)))?
    }

    #[instrument(skip_all, fields(argc = args.len()))]
    async fn run(&self, args: &[String]) -> Result<i32> {
        let runtime_path = self.runtime_path.clone();
        let args = args.to_vec();

        tokio::task::spawn_blocking(move || {
            let status = Command::new(&runtime_path)
                .args(&args)
                .status()
                .map_err(spawn_error)?;
            Ok(exit_code(status))
        })
        .await
        .map_err(|e| DockerError::CliError(format!("Task join error: {}", e)))?
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(128)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(128)
}

pub mod mock {
    //! Mock container runtime for testing
    //!
    //! Images are registered up front (as local or pullable); every call is
    //! recorded so tests can assert on what would have been run.

    use super::{ContainerRuntime, ImageConfig};
    use crate::errors::{DockerError, Result};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// A recorded runtime call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockCall {
        Inspect(String),
        Pull(String),
        Run(Vec<String>),
    }

    /// Mock runtime implementation
    #[derive(Debug, Clone, Default)]
    pub struct MockRuntime {
        local: Arc<Mutex<HashMap<String, ImageConfig>>>,
        remote: Arc<Mutex<HashMap<String, ImageConfig>>>,
        calls: Arc<Mutex<Vec<MockCall>>>,
        exit_code: i32,
        not_installed: bool,
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an image that exists locally
        pub fn with_image(self, image: &str, config: ImageConfig) -> Self {
            self.local.lock().unwrap().insert(image.to_string(), config);
            self
        }

        /// Register an image that only exists after a pull
        pub fn with_pullable_image(self, image: &str, config: ImageConfig) -> Self {
            self.remote.lock().unwrap().insert(image.to_string(), config);
            self
        }

        /// Exit code returned by `run`
        pub fn with_exit_code(mut self, exit_code: i32) -> Self {
            self.exit_code = exit_code;
            self
        }

        /// Behave as if the runtime binary is missing
        pub fn not_installed(mut self) -> Self {
            self.not_installed = true;
            self
        }

        pub fn calls(&self) -> Vec<MockCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Argument lists passed to `run`
        pub fn run_history(&self) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    MockCall::Run(args) => Some(args),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: MockCall) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.not_installed {
                return Err(DockerError::NotInstalled.into());
            }
            Ok(())
        }
    }

    impl ContainerRuntime for MockRuntime {
        fn program(&self) -> &str {
            "docker"
        }

        async fn inspect_image(&self, image: &str) -> Result<Option<ImageConfig>> {
            self.record(MockCall::Inspect(image.to_string()))?;
            Ok(self.local.lock().unwrap().get(image).cloned())
        }

        async fn pull_image(&self, image: &str) -> Result<()> {
            self.record(MockCall::Pull(image.to_string()))?;
            let pulled = self.remote.lock().unwrap().remove(image);
            match pulled {
                Some(config) => {
                    self.local.lock().unwrap().insert(image.to_string(), config);
                    Ok(())
                }
                None => Err(DockerError::CliError(format!("Failed to pull image: {}", image)).into()),
            }
        }

        async fn run(&self, args: &[String]) -> Result<i32> {
            self.record(MockCall::Run(args.to_vec()))?;
            Ok(self.exit_code)
        }
    }
}
