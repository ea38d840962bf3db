use crate::domain::{
    CommandOutput, ComposeFlavor, ContainerEngine, EngineCli, EngineCommand, EngineKind,
};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::process::{Command, Stdio};
use tracing::debug;

/// Spawns real engine processes
#[derive(Debug)]
pub struct EngineAdapter;

impl EngineAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EngineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerEngine for EngineAdapter {
    fn run(&self, command: &EngineCommand) -> Result<CommandOutput> {
        debug!("executando: {command}");
        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .with_context(|| format!("executando `{command}`"))?;

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn capture(&self, command: &EngineCommand) -> Result<CommandOutput> {
        debug!("consultando: {command}");
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("executando `{command}`"))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn is_command_available(&self, program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Which engine the user asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimePreference {
    #[default]
    Auto,
    Podman,
    Docker,
}

impl RuntimePreference {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "podman" => Ok(Self::Podman),
            "docker" => Ok(Self::Docker),
            other => bail!("Runtime '{other}' inválido: use 'podman', 'docker' ou 'auto'"),
        }
    }
}

/// Picks the engine binary and compose flavor. Auto prefers podman.
pub fn detect_engine(
    engine: &dyn ContainerEngine,
    preference: RuntimePreference,
    sudo: bool,
) -> Result<EngineCli> {
    let kind = match preference {
        RuntimePreference::Podman => {
            if !engine.is_command_available("podman") {
                bail!("Runtime 'podman' configurado mas podman não foi encontrado no PATH");
            }
            EngineKind::Podman
        }
        RuntimePreference::Docker => {
            if !engine.is_command_available("docker") {
                bail!("Runtime 'docker' configurado mas docker não foi encontrado no PATH");
            }
            EngineKind::Docker
        }
        RuntimePreference::Auto => {
            if engine.is_command_available("podman") {
                EngineKind::Podman
            } else if engine.is_command_available("docker") {
                EngineKind::Docker
            } else {
                bail!("Nenhum container runtime encontrado (podman ou docker)");
            }
        }
    };

    let compose = match kind {
        EngineKind::Docker => ComposeFlavor::Plugin,
        EngineKind::Podman => {
            let probe = EngineCommand::new("podman", ["compose", "version"]);
            match engine.capture(&probe) {
                Ok(out) if out.success => ComposeFlavor::Plugin,
                _ => ComposeFlavor::Standalone,
            }
        }
    };

    debug!("runtime {kind} com compose {:?} (sudo: {sudo})", compose);
    Ok(EngineCli::new(kind, compose, sudo))
}
