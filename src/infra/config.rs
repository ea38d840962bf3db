use crate::infra::engine_adapter::RuntimePreference;
use crate::infra::path_resolver::PathOverrides;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DEVARCH_TOML_NAME: &str = "devarch.toml";
pub const DEFAULT_REGISTRY_NAME: &str = "registry.yml";
pub const DEFAULT_DEVARCH_TOML: &str = include_str!("../../config/default_devarch.toml");
pub const DEFAULT_REGISTRY_YML: &str = include_str!("../../config/registry.yml");

pub const DEFAULT_NETWORK: &str = "microservices-net";
pub const DEFAULT_COMPOSE_DIR: &str = "~/devarch/compose";
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 2;

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
        .join(".config/devarch")
}

pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    fs::create_dir_all(config_dir).with_context(|| format!("criando {:?}", config_dir))
}

#[derive(Deserialize, Debug, Default)]
pub struct EngineConfig {
    pub runtime: Option<String>,
    pub sudo: Option<bool>,
    pub network: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PathsConfig {
    pub compose_dir: Option<PathBuf>,
    pub registry: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RegistryConfig {
    pub discover: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct OverridesConfig {
    #[serde(default)]
    pub services: HashMap<String, PathBuf>,
    #[serde(default)]
    pub categories: HashMap<String, PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
pub struct HealthConfig {
    pub timeout: Option<u64>,
    pub interval: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct SafetyConfig {
    pub preserve_data: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub overrides: OverridesConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

impl AppConfig {
    /// Merges another AppConfig into self.
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: AppConfig) {
        if let Some(runtime) = other.engine.runtime {
            self.engine.runtime = Some(runtime);
        }
        if let Some(sudo) = other.engine.sudo {
            self.engine.sudo = Some(sudo);
        }
        if let Some(network) = other.engine.network {
            self.engine.network = Some(network);
        }
        if let Some(dir) = other.paths.compose_dir {
            self.paths.compose_dir = Some(dir);
        }
        if let Some(registry) = other.paths.registry {
            self.paths.registry = Some(registry);
        }
        if let Some(discover) = other.registry.discover {
            self.registry.discover = Some(discover);
        }
        if let Some(timeout) = other.health.timeout {
            self.health.timeout = Some(timeout);
        }
        if let Some(interval) = other.health.interval {
            self.health.interval = Some(interval);
        }
        if let Some(preserve) = other.safety.preserve_data {
            self.safety.preserve_data = Some(preserve);
        }

        // Overrides with the same key in 'other' replace existing ones
        self.overrides.services.extend(other.overrides.services);
        self.overrides.categories.extend(other.overrides.categories);
    }

    /// Applies DEVARCH_* variables on top of file values
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(runtime) = var("DEVARCH_RUNTIME").filter(|v| !v.trim().is_empty()) {
            self.engine.runtime = Some(runtime);
        }
        if let Some(sudo) = var("DEVARCH_USE_SUDO") {
            self.engine.sudo = Some(sudo.trim() == "true");
        }
        if let Some(dir) = var("DEVARCH_COMPOSE_DIR").filter(|v| !v.trim().is_empty()) {
            self.paths.compose_dir = Some(PathBuf::from(dir));
        }
    }

    /// Fills defaults and expands `~`, producing the run-wide settings
    pub fn into_settings(self) -> Result<Settings> {
        let runtime = match self.engine.runtime.as_deref() {
            Some(raw) => RuntimePreference::parse(raw)?,
            None => RuntimePreference::Auto,
        };

        let compose_dir = expand(
            self.paths
                .compose_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_COMPOSE_DIR)),
        );

        let overrides = PathOverrides {
            services: self
                .overrides
                .services
                .into_iter()
                .map(|(k, v)| (k, expand(v)))
                .collect(),
            categories: self
                .overrides
                .categories
                .into_iter()
                .map(|(k, v)| (k, expand(v)))
                .collect(),
        };

        let interval = self
            .health
            .interval
            .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS)
            .max(1);

        Ok(Settings {
            runtime,
            sudo: self.engine.sudo.unwrap_or(false),
            network: self
                .engine
                .network
                .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            compose_dir,
            registry_file: self.paths.registry.map(expand),
            discover: self.registry.discover.unwrap_or(false),
            overrides,
            health_timeout: Duration::from_secs(
                self.health.timeout.unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS),
            ),
            health_interval: Duration::from_secs(interval),
            preserve_data: self.safety.preserve_data.unwrap_or(false),
        })
    }
}

/// Run-wide configuration, built once at startup and passed down
#[derive(Debug, Clone)]
pub struct Settings {
    pub runtime: RuntimePreference,
    pub sudo: bool,
    pub network: String,
    pub compose_dir: PathBuf,
    pub registry_file: Option<PathBuf>,
    pub discover: bool,
    pub overrides: PathOverrides,
    pub health_timeout: Duration,
    pub health_interval: Duration,
    pub preserve_data: bool,
}

fn expand(path: PathBuf) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.to_string_lossy().as_ref()).into_owned())
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("lendo config em {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("parse de config em {:?}", path))
}

/// Loads `<config_dir>/devarch.toml`, then `<local_dir>/devarch.toml` on top
pub fn load_app_config_from(config_dir: &Path, local_dir: &Path) -> Result<AppConfig> {
    let mut app_config = AppConfig::default();

    let global_config_path = config_dir.join(DEFAULT_DEVARCH_TOML_NAME);
    if global_config_path.exists() {
        app_config = read_config(&global_config_path)?;
        debug!("config global carregada de {:?}", global_config_path);
    }

    let local_config_path = local_dir.join(DEFAULT_DEVARCH_TOML_NAME);
    if local_config_path.exists() && local_config_path != global_config_path {
        app_config.merge(read_config(&local_config_path)?);
        debug!("config local carregada de {:?}", local_config_path);
    }

    // Without an explicit registry, use the one installed next to the config
    if app_config.paths.registry.is_none() {
        let installed = config_dir.join(DEFAULT_REGISTRY_NAME);
        if installed.exists() {
            app_config.paths.registry = Some(installed);
        }
    }

    Ok(app_config)
}

/// Global + local config, environment overrides and defaults
pub fn load_settings(config_dir: &Path) -> Result<Settings> {
    let mut app_config = load_app_config_from(config_dir, Path::new("."))?;
    app_config.apply_env(|key| std::env::var(key).ok());
    app_config.into_settings()
}

pub fn install_default_config(target_dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_config_dir(target_dir)?;

    let files = [
        (DEFAULT_DEVARCH_TOML_NAME, DEFAULT_DEVARCH_TOML),
        (DEFAULT_REGISTRY_NAME, DEFAULT_REGISTRY_YML),
    ];

    let mut written = Vec::new();
    for (name, content) in files {
        let target = target_dir.join(name);

        if target.exists() {
            continue;
        }

        fs::write(&target, content)
            .with_context(|| format!("escrevendo template em {:?}", target))?;
        written.push(target);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_full_config() {
        let toml = r#"
[engine]
runtime = "docker"
sudo = true
network = "devnet"

[paths]
compose_dir = "/srv/compose"

[health]
timeout = 30

[overrides.services]
"postgres.yml" = "/opt/pg.yml"

[overrides.categories]
ai = "/opt/ai"
"#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        let settings = config.into_settings().unwrap();

        assert_eq!(settings.runtime, RuntimePreference::Docker);
        assert!(settings.sudo);
        assert_eq!(settings.network, "devnet");
        assert_eq!(settings.compose_dir, PathBuf::from("/srv/compose"));
        assert_eq!(settings.health_timeout, Duration::from_secs(30));
        assert_eq!(
            settings.health_interval,
            Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS)
        );
        assert_eq!(
            settings.overrides.services.get("postgres.yml"),
            Some(&PathBuf::from("/opt/pg.yml"))
        );
        assert_eq!(
            settings.overrides.categories.get("ai"),
            Some(&PathBuf::from("/opt/ai"))
        );
    }

    #[test]
    fn defaults_when_empty() {
        let settings = AppConfig::default().into_settings().unwrap();

        assert_eq!(settings.runtime, RuntimePreference::Auto);
        assert!(!settings.sudo);
        assert!(!settings.preserve_data);
        assert_eq!(settings.network, DEFAULT_NETWORK);
        assert!(settings.compose_dir.ends_with("devarch/compose"));
    }

    #[test]
    fn rejects_unknown_runtime() {
        let config: AppConfig = toml::from_str("[engine]\nruntime = \"lxc\"\n").unwrap();
        assert!(config.into_settings().is_err());
    }

    #[test]
    fn local_config_overrides_global() {
        let global = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();

        fs::write(
            global.path().join(DEFAULT_DEVARCH_TOML_NAME),
            "[engine]\nruntime = \"podman\"\nnetwork = \"global-net\"\n\n[overrides.services]\n\"a.yml\" = \"/a.yml\"\n",
        )
        .unwrap();
        fs::write(
            local.path().join(DEFAULT_DEVARCH_TOML_NAME),
            "[engine]\nnetwork = \"local-net\"\n\n[overrides.services]\n\"b.yml\" = \"/b.yml\"\n",
        )
        .unwrap();

        let config = load_app_config_from(global.path(), local.path()).unwrap();

        assert_eq!(config.engine.runtime.as_deref(), Some("podman"));
        assert_eq!(config.engine.network.as_deref(), Some("local-net"));
        assert_eq!(config.overrides.services.len(), 2);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: AppConfig =
            toml::from_str("[engine]\nruntime = \"podman\"\nsudo = false\n").unwrap();

        config.apply_env(|key| match key {
            "DEVARCH_RUNTIME" => Some("docker".to_string()),
            "DEVARCH_USE_SUDO" => Some("true".to_string()),
            "DEVARCH_COMPOSE_DIR" => Some("/env/compose".to_string()),
            _ => None,
        });

        let settings = config.into_settings().unwrap();
        assert_eq!(settings.runtime, RuntimePreference::Docker);
        assert!(settings.sudo);
        assert_eq!(settings.compose_dir, PathBuf::from("/env/compose"));
    }

    #[test]
    fn installed_registry_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();

        let written = install_default_config(dir.path()).unwrap();
        assert_eq!(written.len(), 2);

        let config = load_app_config_from(dir.path(), local.path()).unwrap();
        assert_eq!(
            config.paths.registry,
            Some(dir.path().join(DEFAULT_REGISTRY_NAME))
        );

        // Second install keeps existing files
        assert!(install_default_config(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn default_template_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_DEVARCH_TOML).unwrap();
        let settings = config.into_settings().unwrap();
        assert_eq!(settings.health_timeout, Duration::from_secs(120));
    }
}
