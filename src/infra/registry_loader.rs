use crate::domain::{ServiceCategory, ServiceRegistry};
use crate::infra::config::{DEFAULT_REGISTRY_YML, Settings};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Startup order used when categories are discovered from disk
pub const DEFAULT_CATEGORY_ORDER: &[&str] = &[
    "database",
    "storage",
    "dbms",
    "erp",
    "security",
    "registry",
    "gateway",
    "proxy",
    "management",
    "backend",
    "ci",
    "project",
    "mail",
    "exporters",
    "analytics",
    "messaging",
    "search",
    "workflow",
    "docs",
    "testing",
    "collaboration",
    "ai",
    "support",
];

#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryDocument {
    Root { categories: Vec<ServiceCategory> },
    List(Vec<ServiceCategory>),
}

pub fn parse_registry(content: &str, origin: &str) -> Result<ServiceRegistry> {
    if content.trim().is_empty() {
        bail!("Registro de serviços vazio em {origin}");
    }

    let doc: RegistryDocument =
        serde_yml::from_str(content).with_context(|| format!("parse de {origin}"))?;

    let categories = match doc {
        RegistryDocument::Root { categories } => categories,
        RegistryDocument::List(list) => list,
    };

    for category in &categories {
        if category.services.is_empty() {
            bail!("Categoria '{}' em {origin} não declara serviços", category.name);
        }
    }

    ServiceRegistry::new(categories).with_context(|| format!("validando {origin}"))
}

pub fn default_registry() -> Result<ServiceRegistry> {
    parse_registry(DEFAULT_REGISTRY_YML, "registro embutido")
}

pub fn load_registry_file(path: &Path) -> Result<ServiceRegistry> {
    let content = fs::read_to_string(path).with_context(|| format!("lendo {:?}", path))?;
    parse_registry(&content, &path.display().to_string())
}

/// Builds a registry from `<compose_dir>/<category>/*.yml`.
///
/// Known categories follow [`DEFAULT_CATEGORY_ORDER`]; the rest are appended
/// sorted by name. Services are sorted by file name; empty directories are
/// ignored.
pub fn discover_registry(compose_dir: &Path) -> Result<ServiceRegistry> {
    let entries = fs::read_dir(compose_dir)
        .with_context(|| format!("lendo diretório de compose {:?}", compose_dir))?;

    let mut found = BTreeSet::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                found.insert(name.to_string());
            }
        }
    }

    let mut ordered: Vec<String> = DEFAULT_CATEGORY_ORDER
        .iter()
        .filter(|c| found.remove(**c))
        .map(|c| c.to_string())
        .collect();
    ordered.extend(found);

    let mut categories = Vec::new();
    for name in ordered {
        let dir = compose_dir.join(&name);
        let mut files: Vec<String> = fs::read_dir(&dir)
            .with_context(|| format!("lendo {:?}", dir))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "yml"))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        files.sort();

        if files.is_empty() {
            debug!("Categoria {name} sem arquivos .yml, ignorada");
            continue;
        }

        categories.push(ServiceCategory::new(&name, files));
    }

    ServiceRegistry::new(categories)
}

/// Picks discovery, a registry file or the embedded default
pub fn load_registry(settings: &Settings) -> Result<ServiceRegistry> {
    if settings.discover {
        info!("Descobrindo categorias em {:?}", settings.compose_dir);
        return discover_registry(&settings.compose_dir);
    }

    match &settings.registry_file {
        Some(path) => {
            debug!("Registro de serviços: {:?}", path);
            load_registry_file(path)
        }
        None => default_registry(),
    }
}
