use super::command::{CommandOutput, EngineCommand};
use anyhow::Result;
use std::fmt::Debug;

/// The only seam through which external processes are spawned
pub trait ContainerEngine: Send + Sync + Debug {
    /// Run a command with inherited stdio (compose up/down, logs, prune)
    fn run(&self, command: &EngineCommand) -> Result<CommandOutput>;

    /// Run a command capturing stdout/stderr (inspect, ls, du)
    fn capture(&self, command: &EngineCommand) -> Result<CommandOutput>;

    /// Check if a program answers `--version`
    fn is_command_available(&self, program: &str) -> bool;
}

/// Gate for destructive operations
pub trait Confirmation: Send + Sync {
    /// Returns true only if the user typed `phrase` exactly
    fn confirm(&self, prompt: &str, phrase: &str) -> Result<bool>;
}
