use crate::domain::{ContainerHealthStatus, ServiceStatus};
use crate::services::CommandRunner;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

/// Compose project labels set by docker compose and podman-compose
pub const COMPOSE_PROJECT_LABELS: &[&str] =
    &["com.docker.compose.project", "io.podman.compose.project"];

/// Per-container queries; services are addressed by container name
pub struct ContainerService {
    runner: Arc<CommandRunner>,
}

impl ContainerService {
    pub fn new(runner: Arc<CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn get_status(&self, name: &str) -> Result<ServiceStatus> {
        let cmd = self
            .runner
            .cli()
            .engine(["container", "inspect", "--format", "{{.State.Status}}", name]);
        let output = self.runner.query(&cmd)?;

        if !output.success {
            return Ok(ServiceStatus::NotCreated);
        }

        Ok(ServiceStatus::from_engine_state(&output.stdout))
    }

    pub fn get_health_status(&self, name: &str) -> Result<ContainerHealthStatus> {
        let cmd = self.runner.cli().engine([
            "container",
            "inspect",
            "--format",
            "{{if .State.Health}}{{.State.Health.Status}}{{end}}",
            name,
        ]);
        let output = self.runner.query(&cmd)?;

        if !output.success {
            return Ok(ContainerHealthStatus::Unknown);
        }

        Ok(ContainerHealthStatus::from_engine_health(&output.stdout))
    }

    /// `db.adminCommand('ping')` through mongosh inside the container
    pub fn ping_mongo(&self, name: &str) -> Result<bool> {
        let cmd = self.runner.cli().engine([
            "exec",
            name,
            "mongosh",
            "--quiet",
            "--eval",
            "db.adminCommand('ping').ok",
        ]);
        let output = self.runner.query(&cmd)?;
        Ok(output.success && output.stdout.trim() == "1")
    }

    pub fn list_containers(&self) -> Result<Vec<String>> {
        let cmd = self
            .runner
            .cli()
            .engine(["ps", "-a", "--format", "{{.Names}}"]);
        let output = self.runner.query(&cmd)?;

        if !output.success {
            warn!("Não foi possível listar containers: {}", output.stderr.trim());
            return Ok(Vec::new());
        }

        Ok(output.lines())
    }

    pub fn labels(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let cmd = self.runner.cli().engine([
            "container",
            "inspect",
            "--format",
            "{{json .Config.Labels}}",
            name,
        ]);
        let output = self.runner.query(&cmd)?;
        if !output.success {
            return Ok(BTreeMap::new());
        }

        parse_labels(&output.stdout).with_context(|| format!("labels do container {name}"))
    }

    pub fn networks(&self, name: &str) -> Result<Vec<String>> {
        let cmd = self.runner.cli().engine([
            "container",
            "inspect",
            "--format",
            "{{json .NetworkSettings.Networks}}",
            name,
        ]);
        let output = self.runner.query(&cmd)?;
        if !output.success {
            return Ok(Vec::new());
        }

        parse_network_names(&output.stdout)
            .with_context(|| format!("redes do container {name}"))
    }

    /// Force removal; returns whether the engine succeeded
    pub fn remove(&self, name: &str) -> Result<bool> {
        let cmd = self.runner.cli().engine(["rm", "-f", name]);
        Ok(self.runner.execute(&cmd)?.success)
    }
}

pub fn is_compose_managed(labels: &BTreeMap<String, String>) -> bool {
    COMPOSE_PROJECT_LABELS
        .iter()
        .any(|key| labels.get(*key).is_some_and(|v| !v.is_empty()))
}

fn parse_labels(raw: &str) -> Result<BTreeMap<String, String>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(BTreeMap::new());
    }

    let labels: Option<BTreeMap<String, String>> = serde_json::from_str(raw)?;
    Ok(labels.unwrap_or_default())
}

fn parse_network_names(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(Vec::new());
    }

    let networks: Option<HashMap<String, serde_json::Value>> = serde_json::from_str(raw)?;
    let mut names: Vec<String> = networks.unwrap_or_default().into_keys().collect();
    names.sort();
    Ok(names)
}
