use std::process::Command;

use tracing::{info, warn};

use crate::error::CommandError;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn is_silent(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Runs `cmd` through `sh -c` with the inherited environment.
pub fn execute(cmd: &str) -> Result<CommandOutput, CommandError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .map_err(|err| CommandError {
            cmd: cmd.to_string(),
            status: err.to_string(),
            stderr: String::new(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(CommandError {
            cmd: cmd.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }
    Ok(CommandOutput { stdout, stderr })
}

/// Runs a post-apply command. Failures are logged, never returned.
pub fn run(cmd: &str, app: &str) {
    match execute(cmd) {
        Ok(output) if output.is_silent() => {}
        Ok(output) => {
            if !output.stdout.is_empty() {
                info!(app, cmd, "stdout: {}", output.stdout.trim_end());
            }
            if !output.stderr.is_empty() {
                info!(app, cmd, "stderr: {}", output.stderr.trim_end());
            }
        }
        Err(err) => {
            warn!(app, cmd, "command '{cmd}' for app '{app}' failed: {}", err.status);
            if !err.stderr.is_empty() {
                warn!(app, cmd, "stderr: {}", err.stderr.trim_end());
            }
        }
    }
}
