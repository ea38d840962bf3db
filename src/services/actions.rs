use crate::domain::{CommandOutput, OperationTarget};
use crate::services::CommandRunner;
use anyhow::Result;
use std::fmt;
use tracing::{debug, warn};

pub const DEFAULT_STOP_TIMEOUT_SECS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    /// Nothing to do; the target was already in the requested state
    AlreadyDone(String),
    Failed(String),
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    fn from_output(output: &CommandOutput, what: &str) -> Self {
        if output.success {
            Self::Success
        } else {
            Self::Failed(exit_reason(output, what))
        }
    }
}

/// A compose operation applied to one service file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Up { force_recreate: bool },
    Down { timeout: u32, remove_volumes: bool },
    Restart { timeout: u32 },
    Build { no_cache: bool },
    Rebuild { no_cache: bool },
    Logs { follow: bool, tail: Option<u32> },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Self::Up { .. } => "up",
            Self::Down { .. } => "down",
            Self::Restart { .. } => "restart",
            Self::Build { .. } => "build",
            Self::Rebuild { .. } => "rebuild",
            Self::Logs { .. } => "logs",
        };
        f.write_str(verb)
    }
}

impl Action {
    pub fn up() -> Self {
        Self::Up {
            force_recreate: false,
        }
    }

    pub fn down() -> Self {
        Self::Down {
            timeout: DEFAULT_STOP_TIMEOUT_SECS,
            remove_volumes: false,
        }
    }

    /// Whether a successful run leaves containers that may need a health wait
    pub fn starts_containers(&self) -> bool {
        matches!(
            self,
            Self::Up { .. } | Self::Restart { .. } | Self::Rebuild { .. }
        )
    }

    /// Volume removal is the only data-destroying flag an action can carry
    pub fn removes_volumes(&self) -> bool {
        matches!(
            self,
            Self::Down {
                remove_volumes: true,
                ..
            }
        )
    }

    /// Runs the action; engine spawn errors propagate, non-zero exits become
    /// an outcome
    pub fn execute(&self, target: &OperationTarget, runner: &CommandRunner) -> Result<ActionOutcome> {
        if !target.compose_file.found {
            return Ok(ActionOutcome::Failed(format!(
                "arquivo compose de {} não encontrado (expected at {})",
                target.service,
                target.compose_file.path.display()
            )));
        }

        debug!("{} {} ({})", self, target.service, target.category);

        match self {
            Self::Up { force_recreate } => up(target, runner, *force_recreate),
            Self::Down {
                timeout,
                remove_volumes,
            } => down(target, runner, *timeout, *remove_volumes),
            Self::Restart { timeout } => {
                down(target, runner, *timeout, false)?;
                up(target, runner, false)
            }
            Self::Build { no_cache } => build(target, runner, *no_cache),
            Self::Rebuild { no_cache } => {
                down(target, runner, DEFAULT_STOP_TIMEOUT_SECS, false)?;
                match build(target, runner, *no_cache)? {
                    ActionOutcome::Success => up(target, runner, true),
                    other => Ok(other),
                }
            }
            Self::Logs { follow, tail } => {
                let mut args = vec!["logs".to_string()];
                if *follow {
                    args.push("-f".into());
                }
                if let Some(n) = tail {
                    args.push("--tail".into());
                    args.push(n.to_string());
                }
                let cmd = runner.cli().compose(&target.compose_file.path, args);
                let output = runner.stream(&cmd)?;
                Ok(ActionOutcome::from_output(&output, "logs"))
            }
        }
    }
}

fn up(target: &OperationTarget, runner: &CommandRunner, force_recreate: bool) -> Result<ActionOutcome> {
    let mut args = vec!["up", "-d"];
    if force_recreate {
        args.push("--force-recreate");
    }
    let cmd = runner.cli().compose(&target.compose_file.path, args);
    let output = runner.execute(&cmd)?;
    Ok(ActionOutcome::from_output(&output, "up"))
}

fn down(
    target: &OperationTarget,
    runner: &CommandRunner,
    timeout: u32,
    remove_volumes: bool,
) -> Result<ActionOutcome> {
    let timeout = timeout.to_string();
    let mut args = vec!["down", "-t", timeout.as_str()];
    if remove_volumes {
        args.push("-v");
    }
    let cmd = runner.cli().compose(&target.compose_file.path, args);
    let output = runner.execute(&cmd)?;

    if output.success {
        return Ok(ActionOutcome::Success);
    }

    warn!(
        "⚠️  {}: down retornou {} (may have already been stopped)",
        target.service,
        output.code.map_or("sinal".to_string(), |c| c.to_string())
    );
    Ok(ActionOutcome::AlreadyDone(
        "may have already been stopped".to_string(),
    ))
}

fn build(target: &OperationTarget, runner: &CommandRunner, no_cache: bool) -> Result<ActionOutcome> {
    let mut args = vec!["build"];
    if no_cache {
        args.push("--no-cache");
    }
    let cmd = runner.cli().compose(&target.compose_file.path, args);
    let output = runner.execute(&cmd)?;
    Ok(ActionOutcome::from_output(&output, "build"))
}

fn exit_reason(output: &CommandOutput, what: &str) -> String {
    let code = output
        .code
        .map_or("encerrado por sinal".to_string(), |c| format!("código {c}"));
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        format!("{what} falhou ({code})")
    } else {
        format!("{what} falhou ({code}): {stderr}")
    }
}
