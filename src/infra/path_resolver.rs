use crate::domain::ResolvedPath;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Override tables consulted before the `<root>/<category>/<file>` convention
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    /// service file → absolute compose path
    pub services: HashMap<String, PathBuf>,
    /// category → directory prefix
    pub categories: HashMap<String, PathBuf>,
}

/// Locates compose files under the compose root.
///
/// Resolution order:
/// 1. per-service override
/// 2. per-category override joined with the file name
/// 3. `<root>/<category>/<file>`
/// 4. `<root>/<file>`
/// 5. recursive search under `<root>` (sorted, first match)
///
/// Missing files are not an error: the conventional path comes back with
/// `found = false`.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    overrides: PathOverrides,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, overrides: PathOverrides) -> Self {
        Self {
            root: root.into(),
            overrides,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn add_service_override(&mut self, service_file: &str, path: impl Into<PathBuf>) {
        self.overrides
            .services
            .insert(service_file.to_string(), path.into());
    }

    pub fn add_category_override(&mut self, category: &str, prefix: impl Into<PathBuf>) {
        self.overrides
            .categories
            .insert(category.to_string(), prefix.into());
    }

    pub fn conventional(&self, service_file: &str, category: &str) -> PathBuf {
        self.root.join(category).join(service_file)
    }

    pub fn resolve(&self, service_file: &str, category: &str) -> ResolvedPath {
        if let Some(path) = self.overrides.services.get(service_file) {
            debug!("{service_file}: override de serviço {:?}", path);
            return ResolvedPath {
                found: path.is_file(),
                path: path.clone(),
            };
        }

        if let Some(prefix) = self.overrides.categories.get(category) {
            let path = prefix.join(service_file);
            debug!("{service_file}: override de categoria {:?}", path);
            return ResolvedPath {
                found: path.is_file(),
                path,
            };
        }

        let conventional = self.conventional(service_file, category);
        if conventional.is_file() {
            return ResolvedPath {
                path: conventional,
                found: true,
            };
        }

        let flat = self.root.join(service_file);
        if flat.is_file() {
            debug!("{service_file}: encontrado na raiz {:?}", flat);
            return ResolvedPath {
                path: flat,
                found: true,
            };
        }

        if let Some(path) = find_file(&self.root, service_file) {
            debug!("{service_file}: encontrado por busca em {:?}", path);
            return ResolvedPath { path, found: true };
        }

        ResolvedPath {
            path: conventional,
            found: false,
        }
    }
}

fn find_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(|entry| entry.into_path())
}
