use super::registry::{Direction, ServiceFileRef};
use std::path::PathBuf;

/// Outcome of compose file resolution; `found == false` still carries the
/// conventional location so callers can say where the file was expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub found: bool,
}

/// User selection before validation and ordering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetRequest {
    /// Mixed category and service tokens given positionally
    pub targets: Vec<String>,
    /// `--categories`; `None` means every category
    pub categories: Option<Vec<String>>,
    /// `--exclude`
    pub exclude_categories: Vec<String>,
    /// `--services`; filters members of the selected categories
    pub services: Option<Vec<String>>,
    /// `--except-services`
    pub except_services: Vec<String>,
}

impl TargetRequest {
    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Splits a comma separated CLI list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// A bare service selected outside of a whole-category selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSelection {
    pub category: String,
    pub file: ServiceFileRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlan {
    pub name: String,
    pub services: Vec<ServiceFileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub direction: Direction,
    /// Processed before categories
    pub services: Vec<ServiceSelection>,
    /// In startup order, or reversed for stop
    pub categories: Vec<CategoryPlan>,
    /// Categories dropped because every member was filtered out
    pub skipped: Vec<String>,
}

impl ResolvedTargets {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.categories.is_empty()
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Total number of services that will be acted on
    pub fn len(&self) -> usize {
        self.services.len() + self.categories.iter().map(|c| c.services.len()).sum::<usize>()
    }

    /// `(category, file)` pairs in execution order: bare services first
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ServiceFileRef)> {
        self.services
            .iter()
            .map(|s| (s.category.as_str(), &s.file))
            .chain(
                self.categories
                    .iter()
                    .flat_map(|c| c.services.iter().map(move |f| (c.name.as_str(), f))),
            )
    }
}

/// One unit of executor work: a located service file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTarget {
    pub category: String,
    pub service: String,
    pub compose_file: ResolvedPath,
}

impl OperationTarget {
    pub fn new(category: &str, file: &ServiceFileRef, compose_file: ResolvedPath) -> Self {
        Self {
            category: category.to_string(),
            service: file.service_name().to_string(),
            compose_file,
        }
    }
}
