use crate::domain::{CommandOutput, ContainerEngine, EngineCli, EngineCommand};
use anyhow::Result;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Routes commands to the engine, applying dry-run to mutating ones.
///
/// In dry-run mode `execute` prints `would execute: <command>` and records
/// it instead of spawning anything; `query` always runs since it only reads
/// engine state.
pub struct CommandRunner {
    engine: Arc<dyn ContainerEngine>,
    cli: EngineCli,
    dry_run: bool,
    planned: RwLock<Vec<String>>,
}

impl CommandRunner {
    pub fn new(engine: Arc<dyn ContainerEngine>, cli: EngineCli, dry_run: bool) -> Self {
        Self {
            engine,
            cli,
            dry_run,
            planned: RwLock::new(Vec::new()),
        }
    }

    pub fn cli(&self) -> &EngineCli {
        &self.cli
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Mutating command with inherited stdio
    pub fn execute(&self, command: &EngineCommand) -> Result<CommandOutput> {
        if self.dry_run {
            let rendered = command.to_string();
            println!("🔎 would execute: {rendered}");
            if let Ok(mut planned) = self.planned.write() {
                planned.push(rendered);
            }
            return Ok(CommandOutput::ok(""));
        }

        self.engine.run(command)
    }

    /// Read-only command with captured output
    pub fn query(&self, command: &EngineCommand) -> Result<CommandOutput> {
        let output = self.engine.capture(command)?;
        if !output.success {
            debug!("`{command}` retornou {:?}: {}", output.code, output.stderr.trim());
        }
        Ok(output)
    }

    /// Read-only command streaming to the terminal (logs, ps)
    pub fn stream(&self, command: &EngineCommand) -> Result<CommandOutput> {
        self.engine.run(command)
    }

    /// Commands printed instead of executed during a dry run
    pub fn planned(&self) -> Vec<String> {
        self.planned
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}
