use anyhow::{Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Iteration direction over the fixed category order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Start,
    Stop,
}

/// A compose file token such as `postgres.yml`; the service name is its stem
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ServiceFileRef(String);

impl ServiceFileRef {
    pub fn new(file: impl Into<String>) -> Self {
        Self(file.into())
    }

    pub fn file_name(&self) -> &str {
        &self.0
    }

    pub fn service_name(&self) -> &str {
        self.0
            .strip_suffix(".yml")
            .or_else(|| self.0.strip_suffix(".yaml"))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ServiceFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceCategory {
    pub name: String,
    pub services: Vec<ServiceFileRef>,
}

impl ServiceCategory {
    pub fn new<I, S>(name: &str, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            services: files.into_iter().map(|f| ServiceFileRef::new(f)).collect(),
        }
    }
}

/// Static category table plus an exact service-name index
///
/// Category declaration order is the startup order; shutdown walks it in
/// reverse. Services keep their declared order in both directions.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    categories: Vec<ServiceCategory>,
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    pub fn new(categories: Vec<ServiceCategory>) -> Result<Self> {
        let mut index = HashMap::new();
        let mut seen_categories = HashMap::new();

        for (pos, category) in categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                bail!("Categoria {} sem 'name'", pos + 1);
            }

            if seen_categories.insert(category.name.clone(), pos).is_some() {
                bail!("Categoria '{}' declarada mais de uma vez", category.name);
            }

            for file in &category.services {
                let service = file.service_name().to_string();
                if service.trim().is_empty() {
                    bail!("Categoria '{}' contém serviço sem nome", category.name);
                }

                if let Some(previous) = index.insert(service.clone(), pos) {
                    bail!(
                        "Serviço '{}' aparece em '{}' e em '{}'",
                        service,
                        categories[previous].name,
                        category.name
                    );
                }
            }
        }

        Ok(Self { categories, index })
    }

    /// Categories in startup order
    pub fn categories(&self) -> &[ServiceCategory] {
        &self.categories
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    /// Category names walked in the given direction
    pub fn ordered(&self, direction: Direction) -> Vec<&str> {
        let mut names = self.category_names();
        if direction == Direction::Stop {
            names.reverse();
        }
        names
    }

    pub fn category(&self, name: &str) -> Option<&ServiceCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn services_in(&self, category: &str) -> Option<&[ServiceFileRef]> {
        self.category(category).map(|c| c.services.as_slice())
    }

    pub fn is_category(&self, name: &str) -> bool {
        self.category(name).is_some()
    }

    pub fn contains_service(&self, service: &str) -> bool {
        self.index.contains_key(service)
    }

    /// Exact lookup; `postgres` never matches `old-postgres.yml`
    pub fn category_of(&self, service: &str) -> Option<&ServiceCategory> {
        self.index.get(service).map(|&pos| &self.categories[pos])
    }

    pub fn service_file(&self, service: &str) -> Option<(&ServiceCategory, &ServiceFileRef)> {
        let category = self.category_of(service)?;
        let file = category
            .services
            .iter()
            .find(|f| f.service_name() == service)?;
        Some((category, file))
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|c| c.services.iter().map(|f| f.service_name()))
    }
}
