//! External process execution
//!
//! Runs the post-install and pre-uninstall scripts shipped inside releases.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::HookError;
use crate::infra::host::HostPlatform;

/// Runs a command line and reports its exit code
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        command_line: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<i32, HookError>;
}

/// Runner spawning real processes through tokio
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        command_line: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<i32, HookError> {
        let command = command_line.join(" ");
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| HookError::SpawnFailed {
                command: command.clone(),
                error: "empty command line".to_string(),
            })?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| HookError::SpawnFailed {
                command: command.clone(),
                error: e.to_string(),
            })?;

        if !output.stdout.is_empty() {
            tracing::debug!(command, stdout = %String::from_utf8_lossy(&output.stdout), "Hook output");
        }
        if !output.stderr.is_empty() {
            tracing::debug!(command, stderr = %String::from_utf8_lossy(&output.stderr), "Hook error output");
        }
        // Killed by a signal
        Ok(output.status.code().unwrap_or(-1))
    }
}

/// Path of a release hook script (`<hook>.sh`, or `<hook>.bat` on Windows)
pub fn hook_script(dir: &Path, hook: &str, host: &HostPlatform) -> PathBuf {
    dir.join(format!("{hook}.{}", host.script_extension()))
}

/// Command line running `script`
pub fn hook_command_line(script: &Path, host: &HostPlatform) -> Vec<String> {
    let script = script.display().to_string();
    if host.script_extension() == "bat" {
        vec!["cmd".to_string(), "/C".to_string(), script]
    } else {
        vec!["sh".to_string(), script]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::host::{HostArch, HostOs};
    use tempfile::TempDir;

    #[test]
    fn test_hook_script_extension() {
        let linux = HostPlatform::new(HostOs::Linux, HostArch::X86_64);
        let windows = HostPlatform::new(HostOs::Windows, HostArch::X86_64);
        let dir = Path::new("/r");
        assert_eq!(hook_script(dir, "post_install", &linux), PathBuf::from("/r/post_install.sh"));
        assert_eq!(
            hook_script(dir, "pre_uninstall", &windows),
            PathBuf::from("/r/pre_uninstall.bat")
        );
        assert_eq!(
            hook_command_line(Path::new("/r/post_install.bat"), &windows)[0],
            "cmd"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_reports_exit_code_and_env() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("post_install.sh");
        std::fs::write(&script, "echo \"$PLATMAN_TEST\" > out.txt\nexit 3\n").unwrap();

        let host = HostPlatform::new(HostOs::Linux, HostArch::X86_64);
        let code = TokioProcessRunner::new()
            .run(
                &hook_command_line(&script, &host),
                temp.path(),
                &[("PLATMAN_TEST".to_string(), "hello".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(code, 3);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("out.txt")).unwrap().trim(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_runner_spawn_failure() {
        let temp = TempDir::new().unwrap();
        let result = TokioProcessRunner::new()
            .run(&["/nonexistent/binary".to_string()], temp.path(), &[])
            .await;
        assert!(matches!(result, Err(HookError::SpawnFailed { .. })));
    }
}
