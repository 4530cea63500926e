//! Staging and `docker run` command-line assembly
//!
//! A [`ScubaDive`] is one prepared invocation. Preparing it:
//!
//! 1. mounts the project root at the same path in the container and sets the
//!    working directory to the caller's location below it
//! 2. resolves the [`ResolvedContext`] for the user command
//! 3. creates a temporary "scubadir", mounted at `/.scuba`, holding scubainit,
//!    the generated hook scripts and `command.sh`
//! 4. decides the container command: scubainit is always the real
//!    entrypoint and runs `[entrypoint...] <shell> /.scuba/command.sh`
//!
//! The scubadir is removed when the dive is dropped unless temp files are kept.

use crate::config::{Environment, HookKind, ScubaConfig};
use crate::context::{ContextOverrides, ResolvedContext};
use crate::docker::{get_image_command, get_image_entrypoint, make_vol_opt, ContainerRuntime};
use crate::errors::{InternalError, Result, ScubaError};
use crate::shell::shell_quote_cmd;
use crate::user_mapping::{current_umask, format_umask, HostUser};
use crate::volume::VolumeSource;
use std::env;
use std::fmt;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, instrument};

/// Where the scubadir is mounted inside the container
pub const SCUBADIR_CONTAINER_PATH: &str = "/.scuba";

/// Options appended to scuba's own bind mounts (SELinux relabel)
const SCUBA_VOLUME_OPTIONS: [&str; 1] = ["z"];

/// Per-invocation options, typically from the command line
#[derive(Debug, Clone, Default)]
pub struct DiveOptions {
    pub user_command: Vec<String>,
    /// Extra `docker run` arguments, appended last
    pub docker_args: Vec<String>,
    /// Environment given with `-e`
    pub env: Environment,
    pub as_root: bool,
    pub verbose: bool,
    pub image_override: Option<String>,
    pub entrypoint_override: Option<String>,
    pub shell_override: Option<String>,
    pub keep_tempfiles: bool,
    /// Host path of the scubainit binary
    pub scubainit_path: PathBuf,
}

/// A bind mount added by scuba itself
#[derive(Debug, Clone)]
struct ScubaMount {
    host_path: PathBuf,
    container_path: PathBuf,
    options: Vec<String>,
}

#[derive(Debug)]
enum Scubadir {
    Temporary(TempDir),
    Kept(PathBuf),
}

impl Scubadir {
    fn path(&self) -> &Path {
        match self {
            Scubadir::Temporary(dir) => dir.path(),
            Scubadir::Kept(path) => path,
        }
    }
}

/// A prepared scuba invocation
#[derive(Debug)]
pub struct ScubaDive {
    pub context: ResolvedContext,
    verbose: bool,
    as_root: bool,
    cli_docker_args: Vec<String>,
    env_vars: Environment,
    mounts: Vec<ScubaMount>,
    options: Vec<String>,
    workdir: PathBuf,
    docker_cmd: Vec<String>,
    program: String,
    scubadir: Scubadir,
}

impl ScubaDive {
    /// Resolve the context and stage all files for the container
    #[instrument(skip_all, fields(top_path = %top_path.display()))]
    pub async fn prepare<R: ContainerRuntime>(
        config: &ScubaConfig,
        top_path: &Path,
        top_rel: &Path,
        options: DiveOptions,
        runtime: &R,
    ) -> Result<Self> {
        let mut env_vars = options.env.clone();
        add_env(&mut env_vars, "SCUBA_ROOT", top_path.display().to_string())?;

        let overrides = ContextOverrides {
            image: options.image_override.clone(),
            shell: options.shell_override.clone(),
            entrypoint: options.entrypoint_override.clone(),
            as_root: options.as_root,
        };
        let mut context = ResolvedContext::resolve(config, &options.user_command, &overrides)?;
        env_vars.extend(context.environment.clone());

        let tempdir = tempfile::Builder::new()
            .prefix("scubadir")
            .tempdir()
            .map_err(|e| ScubaError::staging("Failed to create scubadir", e))?;
        debug!("Created scubadir {}", tempdir.path().display());

        if is_remote_docker() {
            return Err(ScubaError::RemoteDocker);
        }

        let mut mounts = vec![ScubaMount {
            host_path: top_path.to_path_buf(),
            container_path: top_path.to_path_buf(),
            options: Vec::new(),
        }];
        mounts.push(ScubaMount {
            host_path: tempdir.path().to_path_buf(),
            container_path: PathBuf::from(SCUBADIR_CONTAINER_PATH),
            options: Vec::new(),
        });

        // Inputs for scubainit
        if let Some(umask) = current_umask() {
            add_env(&mut env_vars, "SCUBAINIT_UMASK", format_umask(umask))?;
        }
        if !context.as_root {
            for (name, value) in HostUser::detect()?.scubainit_env() {
                add_env(&mut env_vars, &name, value)?;
            }
        }
        if options.verbose {
            add_env(&mut env_vars, "SCUBAINIT_VERBOSE", "1".to_string())?;
        }

        let scubainit_cpath = copy_scubainit(tempdir.path(), &options.scubainit_path)?;

        for kind in HookKind::ALL {
            let Some(lines) = config.hooks.get(&kind).filter(|l| !l.is_empty()) else {
                continue;
            };
            let name = format!("hooks/{}.sh", kind);
            let mut content = vec![
                format!("#!{}", context.shell),
                "# Auto-generated from .scuba.yml".to_string(),
                "set -e".to_string(),
            ];
            content.extend(lines.iter().cloned());
            let cpath = write_scubadir_file(tempdir.path(), &name, &content)?;
            add_env(
                &mut env_vars,
                &format!("SCUBAINIT_HOOK_{}", kind.as_str().to_uppercase()),
                cpath,
            )?;
        }

        let mut docker_options = Vec::new();
        if io::stdout().is_terminal() && io::stdin().is_terminal() {
            docker_options.push("--tty".to_string());
        }

        // scubainit replaces the entrypoint, so the image's default command
        // has to be emulated here
        let script = match context.script.take() {
            Some(script) => script,
            None => match get_image_command(runtime, &context.image).await? {
                Some(cmd) if !cmd.is_empty() => vec![shell_quote_cmd(&cmd)],
                _ => return Err(ScubaError::NoCommand),
            },
        };
        context.script = Some(script.clone());

        docker_options.push(format!("--entrypoint={}", scubainit_cpath));

        let mut docker_cmd = match &context.entrypoint {
            Some(entrypoint) if entrypoint.is_empty() => Vec::new(),
            Some(entrypoint) => vec![entrypoint.clone()],
            None => get_image_entrypoint(runtime, &context.image)
                .await?
                .unwrap_or_default(),
        };

        let mut content = vec![
            "# Auto-generated from scuba".to_string(),
            "set -e".to_string(),
        ];
        content.extend(script);
        let command_cpath = write_scubadir_file(tempdir.path(), "command.sh", &content)?;
        docker_cmd.push(context.shell.clone());
        docker_cmd.push(command_cpath);

        let scubadir = if options.keep_tempfiles {
            Scubadir::Kept(tempdir.keep())
        } else {
            Scubadir::Temporary(tempdir)
        };

        Ok(Self {
            context,
            verbose: options.verbose,
            as_root: options.as_root,
            cli_docker_args: options.docker_args,
            env_vars,
            mounts,
            options: docker_options,
            workdir: top_path.join(top_rel).components().collect(),
            docker_cmd,
            program: runtime.program().to_string(),
            scubadir,
        })
    }

    /// Host path of the staging directory
    pub fn scubadir(&self) -> &Path {
        self.scubadir.path()
    }

    pub fn env_vars(&self) -> &Environment {
        &self.env_vars
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The complete `docker run` command line, program name first
    pub fn docker_cmdline(&self) -> Result<Vec<String>> {
        let mut args = vec![
            self.program.clone(),
            "run".to_string(),
            // keep STDIN open
            "-i".to_string(),
            "--rm".to_string(),
        ];

        for (name, value) in &self.env_vars {
            args.push(format!("--env={}={}", name, value));
        }

        for mount in &self.mounts {
            let mut options = mount.options.clone();
            options.extend(SCUBA_VOLUME_OPTIONS.iter().map(|o| o.to_string()));
            args.push(make_vol_opt(
                &VolumeSource::HostPath(mount.host_path.clone()),
                &mount.container_path,
                &options,
            )?);
        }

        for volume in self.context.volumes.values() {
            args.push(volume.to_docker_arg()?);
        }

        args.push("-w".to_string());
        args.push(self.workdir.display().to_string());

        args.extend(self.options.iter().cloned());
        args.extend(self.context.docker_args.iter().cloned());
        args.extend(self.cli_docker_args.iter().cloned());

        args.push(self.context.image.clone());
        args.extend(self.docker_cmd.iter().cloned());

        Ok(args)
    }

    /// Create missing host directories for configured bind mounts
    ///
    /// Paths that cannot be created for lack of permission are left for the
    /// runtime to create as root.
    pub fn try_create_volumes(&self) -> Result<()> {
        if is_remote_docker() {
            return Ok(());
        }

        for host_path in self.context.volumes.values().filter_map(|v| v.host_path()) {
            if host_path.exists() {
                continue;
            }
            match fs::create_dir_all(host_path) {
                Ok(()) => debug!("Created volume host path {}", host_path.display()),
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    debug!("No permission to create {}", host_path.display());
                }
                Err(e) => {
                    return Err(ScubaError::staging(
                        format!("Error creating volume host path: {}", e),
                        e,
                    ))
                }
            }
        }
        Ok(())
    }

    /// Launch the container and return its exit code
    pub async fn run<R: ContainerRuntime>(&self, runtime: &R) -> Result<i32> {
        self.try_create_volumes()?;
        let cmdline = self.docker_cmdline()?;
        runtime.run(&cmdline[1..]).await
    }
}

impl fmt::Display for ScubaDive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<I, T>(f: &mut fmt::Formatter<'_>, level: usize, name: &str, items: I) -> fmt::Result
        where
            I: IntoIterator<Item = T>,
            T: fmt::Display,
        {
            writeln!(f, "{}{}:", "  ".repeat(level), name)?;
            for item in items {
                writeln!(f, "{}{}", "  ".repeat(level + 1), item)?;
            }
            Ok(())
        }

        fn scalar(f: &mut fmt::Formatter<'_>, level: usize, name: &str, value: impl fmt::Display) -> fmt::Result {
            writeln!(f, "{}{:<14}{}", "  ".repeat(level), format!("{}:", name), value)
        }

        writeln!(f, "ScubaDive")?;
        scalar(f, 1, "verbose", self.verbose)?;
        scalar(f, 1, "as_root", self.as_root)?;
        scalar(f, 1, "workdir", self.workdir.display())?;
        list(f, 1, "options", &self.options)?;
        list(f, 1, "docker_args", &self.cli_docker_args)?;
        list(
            f,
            1,
            "env_vars",
            self.env_vars.iter().map(|(k, v)| format!("{}={}", k, v)),
        )?;
        list(
            f,
            1,
            "volumes",
            self.mounts.iter().map(|m| {
                let mut options = m.options.clone();
                options.extend(SCUBA_VOLUME_OPTIONS.iter().map(|o| o.to_string()));
                format!(
                    "{} => {} {}",
                    m.host_path.display(),
                    m.container_path.display(),
                    options.join(",")
                )
            }),
        )?;

        writeln!(f, "  context:")?;
        list(f, 2, "script", self.context.script.iter().flatten())?;
        scalar(f, 2, "image", &self.context.image)?;
        list(f, 2, "docker_args", &self.context.docker_args)?;
        list(
            f,
            2,
            "volumes",
            self.context.volumes.values().map(|v| match &v.source {
                VolumeSource::HostPath(host) => {
                    format!("{} => {}", host.display(), v.container_path.display())
                }
                VolumeSource::Named(name) => {
                    format!("{} => {}", name, v.container_path.display())
                }
            }),
        )
    }
}

fn is_remote_docker() -> bool {
    env::var_os("DOCKER_HOST").is_some()
}

/// Add a variable that scuba itself sets; clashes are a bug
fn add_env(env_vars: &mut Environment, name: &str, value: String) -> Result<()> {
    if env_vars.contains_key(name) {
        return Err(InternalError::Generic {
            message: format!("Environment variable {} set more than once", name),
        }
        .into());
    }
    env_vars.insert(name.to_string(), value);
    Ok(())
}

/// Copy scubainit into the scubadir, returning its container path
fn copy_scubainit(scubadir: &Path, source: &Path) -> Result<String> {
    if !source.is_file() {
        return Err(ScubaError::Staging {
            message: format!("scubainit not found at \"{}\"", source.display()),
            source: None,
        });
    }
    fs::copy(source, scubadir.join("scubainit"))
        .map_err(|e| ScubaError::staging("Failed to copy scubainit", e))?;
    Ok(format!("{}/scubainit", SCUBADIR_CONTAINER_PATH))
}

/// Write `lines` to `name` inside the scubadir, returning its container path
fn write_scubadir_file(scubadir: &Path, name: &str, lines: &[String]) -> Result<String> {
    let path = scubadir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ScubaError::staging(format!("Failed to create {}", parent.display()), e))?;
    }

    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content)
        .map_err(|e| ScubaError::staging(format!("Failed to write {}", path.display()), e))?;

    Ok(format!("{}/{}", SCUBADIR_CONTAINER_PATH, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::mock::MockRuntime;
    use crate::docker::ImageConfig;
    use crate::errors::ConfigError;
    use serde_yaml::Value;
    use serial_test::serial;
    use tempfile::TempDir;

    struct Fixture {
        _project: TempDir,
        root: PathBuf,
        scubainit: PathBuf,
    }

    fn fixture() -> Fixture {
        let project = TempDir::new().unwrap();
        let root = project.path().to_path_buf();
        let scubainit = root.join("scubainit-bin");
        fs::write(&scubainit, "#!/bin/sh\n").unwrap();
        Fixture {
            _project: project,
            root,
            scubainit,
        }
    }

    fn config(text: &str, root: &Path) -> ScubaConfig {
        let doc: Value = serde_yaml::from_str(text).unwrap();
        ScubaConfig::from_value(&doc, Some(root)).unwrap()
    }

    fn options(fx: &Fixture, command: &[&str]) -> DiveOptions {
        DiveOptions {
            user_command: command.iter().map(|s| s.to_string()).collect(),
            as_root: true,
            scubainit_path: fx.scubainit.clone(),
            ..Default::default()
        }
    }

    fn runtime() -> MockRuntime {
        MockRuntime::new().with_image(
            "busybox",
            ImageConfig::new(Some(vec!["sh".to_string()]), None),
        )
    }

    #[tokio::test]
    #[serial]
    async fn test_cmdline_layout() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config(
            "image: busybox\ndocker_args: --privileged\nenvironment:\n  FOO: bar\nvolumes:\n  /data: /host/data\n",
            &fx.root,
        );
        let mut opts = options(&fx, &["echo", "hi there"]);
        opts.docker_args = vec!["--net=host".to_string()];

        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new("sub/dir"), opts, &runtime())
            .await
            .unwrap();
        let args = dive.docker_cmdline().unwrap();

        assert_eq!(&args[..4], &["docker", "run", "-i", "--rm"]);
        let root = fx.root.display().to_string();
        assert!(args.contains(&format!("--env=SCUBA_ROOT={}", root)));
        assert!(args.contains(&"--env=FOO=bar".to_string()));
        assert!(args.contains(&format!("--volume={}:{}:z", root, root)));
        assert!(args.contains(&format!(
            "--volume={}:/.scuba:z",
            dive.scubadir().display()
        )));
        assert!(args.contains(&"--volume=/host/data:/data".to_string()));
        assert!(args.contains(&"--entrypoint=/.scuba/scubainit".to_string()));

        let w = args.iter().position(|a| a == "-w").unwrap();
        assert_eq!(args[w + 1], format!("{}/sub/dir", root));

        let privileged = args.iter().position(|a| a == "--privileged").unwrap();
        let net = args.iter().position(|a| a == "--net=host").unwrap();
        let image = args.iter().position(|a| a == "busybox").unwrap();
        assert!(privileged < net && net < image);
        assert_eq!(&args[image + 1..], &["/bin/sh", "/.scuba/command.sh"]);

        let command = fs::read_to_string(dive.scubadir().join("command.sh")).unwrap();
        assert_eq!(command, "# Auto-generated from scuba\nset -e\necho 'hi there'\n");
        assert!(dive.scubadir().join("scubainit").is_file());
    }

    #[tokio::test]
    #[serial]
    async fn test_image_default_command() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: busybox", &fx.root);
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &[]), &runtime())
            .await
            .unwrap();

        assert_eq!(dive.context.script, Some(vec!["sh".to_string()]));
        assert_eq!(dive.workdir(), fx.root.as_path());
    }

    #[tokio::test]
    #[serial]
    async fn test_no_command_anywhere() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: empty", &fx.root);
        let runtime = MockRuntime::new().with_image("empty", ImageConfig::default());
        let err = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &[]), &runtime)
            .await
            .unwrap_err();
        assert!(matches!(err, ScubaError::NoCommand));
    }

    #[tokio::test]
    #[serial]
    async fn test_entrypoint_handling() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let runtime = MockRuntime::new().with_image(
            "img",
            ImageConfig::new(None, Some(vec!["/image-entry".to_string(), "-x".to_string()])),
        );

        let cfg = config("image: img", &fx.root);
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime)
            .await
            .unwrap();
        let args = dive.docker_cmdline().unwrap();
        assert!(args.ends_with(&[
            "img".to_string(),
            "/image-entry".to_string(),
            "-x".to_string(),
            "/bin/sh".to_string(),
            "/.scuba/command.sh".to_string(),
        ]));

        let cfg = config("image: img\nentrypoint:\n", &fx.root);
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime)
            .await
            .unwrap();
        let args = dive.docker_cmdline().unwrap();
        assert!(args.ends_with(&[
            "img".to_string(),
            "/bin/sh".to_string(),
            "/.scuba/command.sh".to_string(),
        ]));

        let mut opts = options(&fx, &["ls"]);
        opts.entrypoint_override = Some("/cli-entry".to_string());
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), opts, &runtime)
            .await
            .unwrap();
        let args = dive.docker_cmdline().unwrap();
        assert!(args.ends_with(&[
            "img".to_string(),
            "/cli-entry".to_string(),
            "/bin/sh".to_string(),
            "/.scuba/command.sh".to_string(),
        ]));
    }

    #[tokio::test]
    #[serial]
    async fn test_hook_scripts() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config(
            "image: busybox\nshell: /bin/bash\nhooks:\n  root: apt-get update\n",
            &fx.root,
        );
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime())
            .await
            .unwrap();

        assert_eq!(
            dive.env_vars()["SCUBAINIT_HOOK_ROOT"],
            "/.scuba/hooks/root.sh"
        );
        assert!(!dive.env_vars().contains_key("SCUBAINIT_HOOK_USER"));
        let root_hook = fs::read_to_string(dive.scubadir().join("hooks/root.sh")).unwrap();
        assert_eq!(
            root_hook,
            "#!/bin/bash\n# Auto-generated from .scuba.yml\nset -e\napt-get update\n"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_host_user_env_when_not_root() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: busybox", &fx.root);
        let mut opts = options(&fx, &["ls"]);
        opts.as_root = false;
        opts.verbose = true;

        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), opts, &runtime())
            .await
            .unwrap();
        for name in ["SCUBAINIT_UID", "SCUBAINIT_GID", "SCUBAINIT_USER", "SCUBAINIT_GROUP"] {
            assert!(dive.env_vars().contains_key(name), "{name}");
        }
        assert_eq!(dive.env_vars()["SCUBAINIT_VERBOSE"], "1");
    }

    #[tokio::test]
    #[serial]
    async fn test_remote_docker_rejected() {
        let fx = fixture();
        let cfg = config("image: busybox", &fx.root);
        env::set_var("DOCKER_HOST", "tcp://remote:2375");
        let result =
            ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime()).await;
        env::remove_var("DOCKER_HOST");
        assert!(matches!(result, Err(ScubaError::RemoteDocker)));
    }

    #[tokio::test]
    #[serial]
    async fn test_config_errors_propagate() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("aliases:\n  a: ls\n", &fx.root);
        let err = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["a"]), &runtime())
            .await
            .unwrap_err();
        assert!(matches!(err, ScubaError::Config(ConfigError::ImageNotSet)));
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_scubainit() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: busybox", &fx.root);
        let mut opts = options(&fx, &["ls"]);
        opts.scubainit_path = fx.root.join("does-not-exist");
        let err = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), opts, &runtime())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("scubainit not found at"));
    }

    #[tokio::test]
    #[serial]
    async fn test_scubadir_cleanup_and_keep() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: busybox", &fx.root);

        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime())
            .await
            .unwrap();
        let scubadir = dive.scubadir().to_path_buf();
        assert!(scubadir.exists());
        drop(dive);
        assert!(!scubadir.exists());

        let mut opts = options(&fx, &["ls"]);
        opts.keep_tempfiles = true;
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), opts, &runtime())
            .await
            .unwrap();
        let scubadir = dive.scubadir().to_path_buf();
        drop(dive);
        assert!(scubadir.exists());
        fs::remove_dir_all(scubadir).unwrap();
    }

    #[tokio::test]
    #[serial]
    async fn test_try_create_volumes_and_run() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: busybox\nvolumes:\n  /out: ./build/out\n", &fx.root);
        let runtime = runtime().with_exit_code(3);
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime)
            .await
            .unwrap();

        assert!(!fx.root.join("build/out").exists());
        let code = dive.run(&runtime).await.unwrap();
        assert_eq!(code, 3);
        assert!(fx.root.join("build/out").is_dir());

        let runs = runtime.run_history();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0][0], "run");
    }

    #[tokio::test]
    #[serial]
    async fn test_display_dump() {
        env::remove_var("DOCKER_HOST");
        let fx = fixture();
        let cfg = config("image: busybox", &fx.root);
        let dive = ScubaDive::prepare(&cfg, &fx.root, Path::new(""), options(&fx, &["ls"]), &runtime())
            .await
            .unwrap();
        let dump = dive.to_string();
        assert!(dump.starts_with("ScubaDive\n"));
        assert!(dump.contains("  as_root:      true\n"));
        assert!(dump.contains("    image:        busybox\n"));
        assert!(dump.contains("      ls\n"));
    }
}
