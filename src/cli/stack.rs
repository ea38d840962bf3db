use crate::domain::{ContainerEngine, TargetRequest, split_list};
use crate::infra::config::Settings;
use crate::infra::{FixedConfirmation, confirmation_for, detect_engine};
use crate::infra::registry_loader::load_registry;
use crate::services::{Action, BulkOptions, BulkReport, CommandRunner, DEFAULT_STOP_TIMEOUT_SECS, Orchestrator};
use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Category and service filters shared by `start` and `stop`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Categorias a incluir (separadas por vírgula)
    #[arg(short = 'c', long)]
    pub categories: Option<String>,
    /// Categorias a excluir (separadas por vírgula)
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,
    /// Apenas estes serviços dentro das categorias selecionadas
    #[arg(long)]
    pub services: Option<String>,
    /// Serviços a excluir
    #[arg(long)]
    pub except_services: Option<String>,
}

impl FilterArgs {
    pub fn to_request(&self, targets: &[String]) -> TargetRequest {
        TargetRequest {
            targets: targets.to_vec(),
            categories: self.categories.as_deref().map(split_list),
            exclude_categories: self.exclude.as_deref().map(split_list).unwrap_or_default(),
            services: self.services.as_deref().map(split_list),
            except_services: self
                .except_services
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct StartArgs {
    /// Serviços ou categorias (vazio = todas as categorias)
    pub targets: Vec<String>,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Sobe os serviços de cada categoria em paralelo
    #[arg(short, long)]
    pub parallel: bool,
    /// Não espera os serviços ficarem saudáveis
    #[arg(short = 'w', long)]
    pub no_wait: bool,
    /// Recria containers mesmo sem mudanças
    #[arg(short, long)]
    pub force: bool,
    /// Tempo máximo de espera por saúde, em segundos
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct StopArgs {
    /// Serviços ou categorias (vazio = todas as categorias)
    pub targets: Vec<String>,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Para os serviços de cada categoria em paralelo
    #[arg(short, long)]
    pub parallel: bool,
    /// Remove também os volumes (pede confirmação; ignorado com preserve_data)
    #[arg(long)]
    pub remove_volumes: bool,
    /// Timeout de parada repassado ao compose, em segundos
    #[arg(short, long, default_value_t = DEFAULT_STOP_TIMEOUT_SECS)]
    pub timeout: u32,
    /// Pula a confirmação digitada de --remove-volumes
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpArgs {
    #[arg(required = true)]
    pub targets: Vec<String>,
    /// Recria containers mesmo sem mudanças
    #[arg(short, long)]
    pub force: bool,
    /// Não espera os serviços ficarem saudáveis
    #[arg(short = 'w', long)]
    pub no_wait: bool,
    /// Tempo máximo de espera por saúde, em segundos
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct DownArgs {
    #[arg(required = true)]
    pub targets: Vec<String>,
    /// Timeout de parada, em segundos
    #[arg(short, long, default_value_t = DEFAULT_STOP_TIMEOUT_SECS)]
    pub timeout: u32,
    /// Remove também os volumes (pede confirmação; ignorado com preserve_data)
    #[arg(long)]
    pub remove_volumes: bool,
    /// Pula a confirmação digitada de --remove-volumes
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RestartArgs {
    #[arg(required = true)]
    pub targets: Vec<String>,
    /// Timeout de parada, em segundos
    #[arg(short, long, default_value_t = DEFAULT_STOP_TIMEOUT_SECS)]
    pub timeout: u32,
    #[arg(short = 'w', long)]
    pub no_wait: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RebuildArgs {
    #[arg(required = true)]
    pub targets: Vec<String>,
    /// Ignora o cache de build
    #[arg(long)]
    pub no_cache: bool,
    #[arg(short = 'w', long)]
    pub no_wait: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    pub service: String,
    /// Acompanha a saída
    #[arg(long)]
    pub follow: bool,
    /// Número de linhas finais
    #[arg(long)]
    pub tail: Option<u32>,
}

/// Wires settings, registry and engine into an [`Orchestrator`]
pub fn build_orchestrator(
    settings: &Settings,
    engine: Arc<dyn ContainerEngine>,
    dry_run: bool,
) -> Result<Orchestrator> {
    let registry = load_registry(settings)?;
    let cli = detect_engine(engine.as_ref(), settings.runtime, settings.sudo)?;
    debug!("{} categorias no registro", registry.categories().len());

    let runner = Arc::new(CommandRunner::new(engine, cli, dry_run));
    Ok(Orchestrator::new(runner, Arc::new(registry), settings))
}

fn bulk_options(orchestrator: &Orchestrator, parallel: bool, no_wait: bool, timeout: Option<u64>) -> BulkOptions {
    let mut options = orchestrator.bulk_options();
    options.parallel = parallel;
    options.wait_healthy = !no_wait;
    if let Some(secs) = timeout {
        options.health_timeout = Duration::from_secs(secs);
    }
    options
}

pub fn start(orchestrator: &Orchestrator, args: &StartArgs) -> Result<BulkReport> {
    let request = args.filters.to_request(&args.targets);
    let action = Action::Up {
        force_recreate: args.force,
    };
    let options = bulk_options(orchestrator, args.parallel, args.no_wait, args.timeout);
    orchestrator.start_all(&request, &action, &options)
}

pub fn stop(orchestrator: &Orchestrator, args: &StopArgs) -> Result<BulkReport> {
    let request = args.filters.to_request(&args.targets);
    let action = Action::Down {
        timeout: args.timeout,
        remove_volumes: args.remove_volumes,
    };
    let options = bulk_options(orchestrator, args.parallel, true, None);
    let confirmation = confirmation_for(args.yes);
    orchestrator.stop_all(&request, &action, &options, confirmation.as_ref())
}

pub fn up(orchestrator: &Orchestrator, args: &UpArgs) -> Result<BulkReport> {
    let action = Action::Up {
        force_recreate: args.force,
    };
    let options = bulk_options(orchestrator, false, args.no_wait, args.timeout);
    orchestrator.run_action(&args.targets, &action, &options, &FixedConfirmation(false))
}

pub fn down(orchestrator: &Orchestrator, args: &DownArgs) -> Result<BulkReport> {
    let action = Action::Down {
        timeout: args.timeout,
        remove_volumes: args.remove_volumes,
    };
    let confirmation = confirmation_for(args.yes);
    orchestrator.run_action(
        &args.targets,
        &action,
        &orchestrator.bulk_options(),
        confirmation.as_ref(),
    )
}

pub fn restart(orchestrator: &Orchestrator, args: &RestartArgs) -> Result<BulkReport> {
    let action = Action::Restart {
        timeout: args.timeout,
    };
    let options = bulk_options(orchestrator, false, args.no_wait, None);
    orchestrator.run_action(&args.targets, &action, &options, &FixedConfirmation(false))
}

pub fn rebuild(orchestrator: &Orchestrator, args: &RebuildArgs) -> Result<BulkReport> {
    let action = Action::Rebuild {
        no_cache: args.no_cache,
    };
    let options = bulk_options(orchestrator, false, args.no_wait, None);
    orchestrator.run_action(&args.targets, &action, &options, &FixedConfirmation(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::AppConfig;
    use crate::test_support::MockEngine;
    use std::fs;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        let mut settings = AppConfig::default().into_settings().unwrap();
        settings.compose_dir = dir.path().to_path_buf();
        settings
    }

    #[test]
    fn filters_split_comma_lists() {
        let filters = FilterArgs {
            categories: Some("database, backend".into()),
            exclude: Some("ai".into()),
            services: None,
            except_services: Some("redis,".into()),
        };
        let request = filters.to_request(&["postgres".to_string()]);

        assert_eq!(request.targets, vec!["postgres".to_string()]);
        assert_eq!(
            request.categories,
            Some(vec!["database".to_string(), "backend".to_string()])
        );
        assert_eq!(request.exclude_categories, vec!["ai".to_string()]);
        assert_eq!(request.services, None);
        assert_eq!(request.except_services, vec!["redis".to_string()]);
    }

    #[test]
    fn build_fails_without_engine() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockEngine::new());
        assert!(build_orchestrator(&settings(&dir), mock, false).is_err());
    }

    #[test]
    fn start_with_embedded_registry() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("database")).unwrap();
        fs::write(dir.path().join("database/postgres.yml"), "services: {}\n").unwrap();

        let mock = Arc::new(MockEngine::new());
        mock.set_available(&["podman"]);
        let orchestrator = build_orchestrator(&settings(&dir), mock.clone(), false).unwrap();

        let args = StartArgs {
            targets: vec!["postgres".into()],
            no_wait: true,
            ..Default::default()
        };
        let report = start(&orchestrator, &args).unwrap();

        assert_eq!(report.succeeded, 1);
        assert!(mock.ran("podman compose -f"));
        assert!(mock.ran("database/postgres.yml up -d"));
    }

    #[test]
    fn dry_run_stop_issues_nothing() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockEngine::new());
        mock.set_available(&["docker"]);
        let orchestrator = build_orchestrator(&settings(&dir), mock.clone(), true).unwrap();

        let args = StopArgs {
            filters: FilterArgs {
                categories: Some("database".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let report = stop(&orchestrator, &args).unwrap();

        assert!(mock.get_runs().is_empty());
        // compose files are absent from the temp dir
        assert_eq!(report.failed, 5);
    }
}
