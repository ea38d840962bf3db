use crate::domain::{
    CategoryPlan, Direction, ResolvedTargets, ServiceRegistry, ServiceSelection, TargetRequest,
};
use anyhow::{Result, bail};
use std::collections::HashSet;
use tracing::{debug, info};

/// Turns a [`TargetRequest`] into ordered, deduplicated work.
///
/// Every token is validated before anything is computed; an unknown
/// category or service aborts the whole request.
pub struct TargetResolver<'a> {
    registry: &'a ServiceRegistry,
}

enum Token<'t> {
    Category(&'t str),
    Service(&'t str),
}

impl<'a> TargetResolver<'a> {
    pub fn new(registry: &'a ServiceRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, request: &TargetRequest, direction: Direction) -> Result<ResolvedTargets> {
        self.validate(request)?;

        let excluded_categories: HashSet<&str> =
            request.exclude_categories.iter().map(String::as_str).collect();
        let excluded_services: HashSet<&str> =
            request.except_services.iter().map(String::as_str).collect();
        let included_services: Option<HashSet<&str>> = request
            .services
            .as_ref()
            .map(|list| list.iter().map(String::as_str).collect());

        // Explicit targets, then --categories, then everything
        let mut selected_categories: HashSet<&str> = HashSet::new();
        let mut bare_services: Vec<&str> = Vec::new();

        for token in &request.targets {
            match self.classify(token) {
                Some(Token::Category(name)) => {
                    selected_categories.insert(name);
                }
                Some(Token::Service(name)) if !bare_services.contains(&name) => {
                    bare_services.push(name);
                }
                _ => {}
            }
        }

        if let Some(list) = &request.categories {
            selected_categories.extend(list.iter().map(String::as_str));
        } else if request.targets.is_empty() {
            selected_categories.extend(self.registry.category_names());
        }

        for name in &excluded_categories {
            selected_categories.remove(name);
        }

        let mut categories = Vec::new();
        let mut skipped = Vec::new();

        for name in self.registry.ordered(direction) {
            if !selected_categories.contains(name) {
                continue;
            }

            let services: Vec<_> = self
                .registry
                .services_in(name)
                .unwrap_or_default()
                .iter()
                .filter(|f| !excluded_services.contains(f.service_name()))
                .filter(|f| {
                    included_services
                        .as_ref()
                        .is_none_or(|inc| inc.contains(f.service_name()))
                })
                .cloned()
                .collect();

            if services.is_empty() {
                info!("ℹ️  Categoria {name} sem serviços após filtros, ignorada");
                skipped.push(name.to_string());
                continue;
            }

            categories.push(CategoryPlan {
                name: name.to_string(),
                services,
            });
        }

        let selected: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        let services = bare_services
            .into_iter()
            .filter(|name| !excluded_services.contains(name))
            .filter_map(|name| {
                let (category, file) = self.registry.service_file(name)?;
                if excluded_categories.contains(category.name.as_str()) {
                    debug!("{name} ignorado: categoria {} excluída", category.name);
                    return None;
                }
                if selected.contains(category.name.as_str()) {
                    debug!("{name} já incluído pela categoria {}", category.name);
                    return None;
                }
                Some(ServiceSelection {
                    category: category.name.clone(),
                    file: file.clone(),
                })
            })
            .collect();

        Ok(ResolvedTargets {
            direction,
            services,
            categories,
            skipped,
        })
    }

    fn classify<'t>(&self, token: &'t str) -> Option<Token<'t>> {
        if self.registry.is_category(token) {
            Some(Token::Category(token))
        } else if self.registry.contains_service(token) {
            Some(Token::Service(token))
        } else {
            None
        }
    }

    fn validate(&self, request: &TargetRequest) -> Result<()> {
        let mut unknown = Vec::new();

        for token in &request.targets {
            if self.classify(token).is_none() {
                unknown.push(format!("alvo '{token}'"));
            }
        }

        let categories = request.categories.iter().flatten();
        for name in categories.chain(&request.exclude_categories) {
            if !self.registry.is_category(name) {
                unknown.push(format!("categoria '{name}'"));
            }
        }

        let services = request.services.iter().flatten();
        for name in services.chain(&request.except_services) {
            if !self.registry.contains_service(name) {
                unknown.push(format!("serviço '{name}'"));
            }
        }

        if !unknown.is_empty() {
            bail!(
                "Desconhecido: {}. Use 'devarch list' para ver categorias e serviços.",
                unknown.join(", ")
            );
        }

        Ok(())
    }
}
