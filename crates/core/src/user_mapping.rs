//! Host user detection
//!
//! scubainit recreates the invoking host user inside the container so files
//! written to bind mounts keep the right ownership. This module gathers the
//! identity and umask that are handed to it through `SCUBAINIT_*` variables.

use crate::errors::{InternalError, Result};
use std::process::Command;
use tracing::{debug, instrument};

/// Identity of the user running scuba
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUser {
    pub uid: u32,
    pub gid: u32,
    pub user: String,
    pub group: String,
}

impl HostUser {
    /// Detect the current host user via the `id` utility
    #[instrument]
    pub fn detect() -> Result<Self> {
        let uid = parse_id(&run_id("-u")?, "UID")?;
        let gid = parse_id(&run_id("-g")?, "GID")?;
        let user = run_id("-un")?;
        let group = run_id("-gn")?;

        debug!(
            "Host user: {}({}) group {}({})",
            user, uid, group, gid
        );
        Ok(Self {
            uid,
            gid,
            user,
            group,
        })
    }

    /// Environment variables that tell scubainit which user to become
    pub fn scubainit_env(&self) -> Vec<(String, String)> {
        vec![
            ("SCUBAINIT_UID".to_string(), self.uid.to_string()),
            ("SCUBAINIT_GID".to_string(), self.gid.to_string()),
            ("SCUBAINIT_USER".to_string(), self.user.clone()),
            ("SCUBAINIT_GROUP".to_string(), self.group.clone()),
        ]
    }
}

fn run_id(flag: &str) -> Result<String> {
    let output = Command::new("id")
        .arg(flag)
        .output()
        .map_err(|e| InternalError::Generic {
            message: format!("Failed to run 'id {}': {}", flag, e),
        })?;

    if !output.status.success() {
        return Err(InternalError::Generic {
            message: format!(
                "'id {}' failed: {}",
                flag,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
        .into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_id(value: &str, what: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|e| {
        InternalError::Generic {
            message: format!("Failed to parse {} '{}': {}", what, value, e),
        }
        .into()
    })
}

/// Current process umask, when the platform exposes it without changing it
pub fn current_umask() -> Option<u32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_umask(&status)
}

/// Extract the `Umask:` field from `/proc/<pid>/status` content
pub fn parse_umask(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Umask:"))
        .and_then(|value| u32::from_str_radix(value.trim(), 8).ok())
}

/// Format a umask the way scubainit expects it (4-digit octal)
pub fn format_umask(umask: u32) -> String {
    format!("{:04o}", umask)
}
