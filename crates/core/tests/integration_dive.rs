//! End-to-end staging tests against the mock runtime

mod common;

use common::{command, write_file, write_project};
use scuba_core::config::ConfigLoader;
use scuba_core::dive::{DiveOptions, ScubaDive};
use scuba_core::docker::mock::{MockCall, MockRuntime};
use scuba_core::docker::ImageConfig;
use scuba_core::errors::{DockerError, ScubaError};
use serial_test::serial;
use std::fs;

const CONFIG: &str = r#"
image: builder:latest
environment:
  CC: gcc
volumes:
  /out: ./out
aliases:
  build:
    script:
      - make -j4
      - make install
    docker_args: --network=none
hooks:
  user: echo hello from hook
"#;

#[tokio::test]
#[serial]
async fn test_alias_run_pulls_missing_image() -> anyhow::Result<()> {
    std::env::remove_var("DOCKER_HOST");
    let project = write_project(&[(".scuba.yml", CONFIG), ("tools/scubainit", "#!/bin/sh\n")]);
    let root = project.path().canonicalize()?;
    write_file(&root, "src/lib/keep", "");

    let discovered = ConfigLoader::discover_config(&root.join("src/lib"), true)?;
    let runtime = MockRuntime::new().with_pullable_image(
        "builder:latest",
        ImageConfig::new(Some(vec!["bash".to_string()]), Some(vec!["/tini".to_string()])),
    );

    let options = DiveOptions {
        user_command: command(&["build"]),
        docker_args: command(&["--cpus=2"]),
        as_root: true,
        scubainit_path: root.join("tools/scubainit"),
        ..Default::default()
    };
    let dive = ScubaDive::prepare(
        &discovered.config,
        &discovered.top_path,
        &discovered.top_rel,
        options,
        &runtime,
    )
    .await?;

    // No script override, so only the entrypoint needed the image
    assert_eq!(
        runtime.calls(),
        vec![
            MockCall::Inspect("builder:latest".to_string()),
            MockCall::Pull("builder:latest".to_string()),
            MockCall::Inspect("builder:latest".to_string()),
        ]
    );

    let args = dive.docker_cmdline()?;
    let w = args.iter().position(|a| a == "-w").unwrap();
    assert_eq!(args[w + 1], root.join("src/lib").display().to_string());
    assert!(args.contains(&"--env=CC=gcc".to_string()));
    assert!(args.contains(&format!("--volume={}:/out", root.join("out").display())));

    let tail = &args[args.iter().position(|a| a == "--network=none").unwrap()..];
    assert_eq!(
        tail,
        &[
            "--network=none",
            "--cpus=2",
            "builder:latest",
            "/tini",
            "/bin/sh",
            "/.scuba/command.sh",
        ]
    );

    let script = fs::read_to_string(dive.scubadir().join("command.sh"))?;
    assert_eq!(script, "# Auto-generated from scuba\nset -e\nmake -j4\nmake install\n");
    let hook = fs::read_to_string(dive.scubadir().join("hooks/user.sh"))?;
    assert!(hook.ends_with("set -e\necho hello from hook\n"));
    assert_eq!(dive.env_vars()["SCUBAINIT_HOOK_USER"], "/.scuba/hooks/user.sh");
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_runtime_missing_is_reported() -> anyhow::Result<()> {
    std::env::remove_var("DOCKER_HOST");
    let project = write_project(&[(".scuba.yml", "image: busybox\n"), ("scubainit", "")]);
    let root = project.path().to_path_buf();
    let config = ConfigLoader::load_from_path(&root.join(".scuba.yml"), &root)?;

    let options = DiveOptions {
        as_root: true,
        scubainit_path: root.join("scubainit"),
        ..Default::default()
    };
    let runtime = MockRuntime::new().not_installed();
    let err = ScubaDive::prepare(&config, &root, std::path::Path::new(""), options, &runtime)
        .await
        .unwrap_err();
    assert!(matches!(err, ScubaError::Docker(DockerError::NotInstalled)));
    Ok(())
}
