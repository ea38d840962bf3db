use crate::domain::{
    CleanupOptions, Confirmation, Direction, OperationTarget, ResolvedTargets, ServiceRegistry,
    ServiceStatus, TargetRequest,
};
use crate::infra::PathResolver;
use crate::infra::config::Settings;
use crate::services::is_compose_managed;
use crate::services::{
    Action, ActionOutcome, BulkExecutor, BulkOptions, BulkReport, CleanupPlan, CleanupPlanner,
    CommandRunner, ContainerService, DELETE_CONFIRMATION_PHRASE, HealthWaiter, SystemService,
    TargetResolver,
};
use anyhow::{Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Orchestrates stack-wide workflows over the registry: bulk start/stop,
/// per-target compose actions, status reporting and cleanup
pub struct Orchestrator {
    runner: Arc<CommandRunner>,
    registry: Arc<ServiceRegistry>,
    paths: PathResolver,
    container_service: Arc<ContainerService>,
    system_service: SystemService,
    health: HealthWaiter,
    network: String,
    health_timeout: Duration,
    preserve_data: bool,
}

impl Orchestrator {
    pub fn new(runner: Arc<CommandRunner>, registry: Arc<ServiceRegistry>, settings: &Settings) -> Self {
        let container_service = Arc::new(ContainerService::new(runner.clone()));
        Self {
            paths: PathResolver::new(&settings.compose_dir, settings.overrides.clone()),
            system_service: SystemService::new(runner.clone()),
            health: HealthWaiter::new(container_service.clone(), settings.health_interval),
            container_service,
            runner,
            registry,
            network: settings.network.clone(),
            health_timeout: settings.health_timeout,
            preserve_data: settings.preserve_data,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn paths(&self) -> &PathResolver {
        &self.paths
    }

    /// Default bulk options with the configured health timeout
    pub fn bulk_options(&self) -> BulkOptions {
        BulkOptions {
            health_timeout: self.health_timeout,
            ..Default::default()
        }
    }

    pub fn resolve(&self, request: &TargetRequest, direction: Direction) -> Result<ResolvedTargets> {
        let targets = TargetResolver::new(&self.registry).resolve(request, direction)?;
        for category in &targets.skipped {
            println!("ℹ️  Categoria {category} ignorada: nenhum serviço restante após filtros");
        }
        Ok(targets)
    }

    /// Starts categories in order, waiting for health between categories
    pub fn start_all(&self, request: &TargetRequest, action: &Action, options: &BulkOptions) -> Result<BulkReport> {
        let targets = self.resolve(request, Direction::Start)?;
        if targets.is_empty() {
            println!("⚠️  Nenhum serviço selecionado.");
            return Ok(BulkReport {
                skipped: targets.skipped.len(),
                ..Default::default()
            });
        }

        info!("🚀 Iniciando {} serviço(s)...", targets.len());
        let report = BulkExecutor::new(&self.runner, &self.paths)
            .with_health(&self.health)
            .run(&targets, action, options);
        report.print_summary();
        Ok(report)
    }

    /// Stops in reverse category order, continuing even if individual
    /// operations fail. `down -v` needs the typed confirmation first.
    pub fn stop_all(
        &self,
        request: &TargetRequest,
        action: &Action,
        options: &BulkOptions,
        confirmation: &dyn Confirmation,
    ) -> Result<BulkReport> {
        let action = self.guard_volumes(action);
        let targets = self.resolve(request, Direction::Stop)?;
        if targets.is_empty() {
            println!("⚠️  Nenhum serviço selecionado.");
            return Ok(BulkReport {
                skipped: targets.skipped.len(),
                ..Default::default()
            });
        }
        self.confirm_volume_removal(&action, &targets, confirmation)?;

        info!("🛑 Encerrando {} serviço(s)...", targets.len());
        let report = BulkExecutor::new(&self.runner, &self.paths).run(&targets, &action, options);
        report.print_summary();
        Ok(report)
    }

    /// Any action over explicit targets; stop-like actions walk in reverse
    pub fn run_action(
        &self,
        targets: &[String],
        action: &Action,
        options: &BulkOptions,
        confirmation: &dyn Confirmation,
    ) -> Result<BulkReport> {
        if targets.is_empty() {
            bail!("Informe ao menos um serviço ou categoria");
        }

        let request = TargetRequest::with_targets(targets.iter().cloned());
        match action {
            Action::Down { .. } => self.stop_all(&request, action, options, confirmation),
            _ => self.start_all(&request, action, options),
        }
    }

    /// `preserve_data` wins over `--remove-volumes`
    fn guard_volumes(&self, action: &Action) -> Action {
        match action {
            Action::Down { timeout, .. } if self.preserve_data && action.removes_volumes() => {
                warn!("⚠️  preserve_data ativo: volumes não serão removidos");
                Action::Down {
                    timeout: *timeout,
                    remove_volumes: false,
                }
            }
            other => other.clone(),
        }
    }

    fn confirm_volume_removal(
        &self,
        action: &Action,
        targets: &ResolvedTargets,
        confirmation: &dyn Confirmation,
    ) -> Result<()> {
        if !action.removes_volumes() || self.runner.is_dry_run() {
            return Ok(());
        }

        let prompt = format!(
            "down -v remove os volumes de {} serviço(s) e TODOS os dados neles.",
            targets.len()
        );
        if !confirmation.confirm(&prompt, DELETE_CONFIRMATION_PHRASE)? {
            bail!("Remoção de volumes cancelada: confirmação não recebida");
        }
        Ok(())
    }

    pub fn logs(&self, service: &str, follow: bool, tail: Option<u32>) -> Result<()> {
        let target = self.operation_target(service)?;
        match (Action::Logs { follow, tail }).execute(&target, &self.runner)? {
            ActionOutcome::Failed(reason) => bail!("{reason}"),
            _ => Ok(()),
        }
    }

    fn operation_target(&self, service: &str) -> Result<OperationTarget> {
        let Some((category, file)) = self.registry.service_file(service) else {
            bail!("Serviço '{service}' não está no registro. Use 'devarch list'.");
        };
        let resolved = self.paths.resolve(file.file_name(), &category.name);
        Ok(OperationTarget::new(&category.name, file, resolved))
    }

    /// Prints every registry service with its current runtime status
    pub fn status(&self) -> Result<()> {
        println!("📦 Status dos serviços ({})", self.runner.cli().kind);
        let mut running = 0;
        let mut total = 0;

        for category in self.registry.categories() {
            println!();
            println!("[{}]", category.name);
            for file in &category.services {
                let status = self.container_service.get_status(file.service_name())?;
                let marker = match status {
                    ServiceStatus::Running => {
                        running += 1;
                        "🟢"
                    }
                    ServiceStatus::Stopped => "🔴",
                    ServiceStatus::NotCreated => "⚪",
                    ServiceStatus::Unknown => "❓",
                };
                total += 1;
                println!("  {marker} {:<24} | {}", file.service_name(), status);
            }
        }

        println!();
        println!("✅ {running}/{total} serviço(s) rodando");
        Ok(())
    }

    /// Categories, services and where each compose file resolved to
    pub fn list(&self) {
        println!("📚 Registro de serviços (raiz: {:?})", self.paths.root());
        let mut missing = 0;

        for category in self.registry.categories() {
            println!();
            println!("[{}] {} serviço(s)", category.name, category.services.len());
            for file in &category.services {
                let resolved = self.paths.resolve(file.file_name(), &category.name);
                let marker = if resolved.found {
                    "✅"
                } else {
                    missing += 1;
                    "❌"
                };
                println!(
                    "  {marker} {:<24} {}",
                    file.service_name(),
                    resolved.path.display()
                );
            }
        }

        if missing > 0 {
            println!();
            println!("⚠️  {missing} arquivo(s) compose não encontrado(s)");
        }
    }

    /// Engine containers, volumes and networks, flagging containers the
    /// stack does not manage
    pub fn list_components(&self) -> Result<()> {
        let containers = self.container_service.list_containers()?;
        println!("🐳 Containers ({})", containers.len());
        let mut unmanaged = 0;
        for name in &containers {
            let managed = self.is_managed(name)?;
            if !managed {
                unmanaged += 1;
            }
            let status = self.container_service.get_status(name)?;
            let flag = if managed { "gerenciado" } else { "não gerenciado" };
            println!("  - {name:<28} | {status:<11} | {flag}");
        }

        let volumes = self.system_service.volumes(false)?;
        println!();
        println!("💾 Volumes ({})", volumes.len());
        for volume in &volumes {
            println!("  - {volume}");
        }

        let images = self.system_service.images()?;
        println!();
        println!("📦 Imagens ({})", images.len());
        for image in &images {
            println!("  - {image}");
        }

        let networks = self.system_service.networks()?;
        println!();
        println!("🌐 Redes ({})", networks.len());
        for network in &networks {
            let marker = if *network == self.network { " (stack)" } else { "" };
            println!("  - {network}{marker}");
        }

        if unmanaged > 0 {
            println!();
            println!("⚠️  {unmanaged} container(s) fora da stack. Veja 'devarch prune-components --cleanup-orphans'.");
        }
        Ok(())
    }

    fn is_managed(&self, name: &str) -> Result<bool> {
        if self.registry.contains_service(name) {
            return Ok(true);
        }
        if self.container_service.networks(name)?.contains(&self.network) {
            return Ok(true);
        }
        Ok(is_compose_managed(&self.container_service.labels(name)?))
    }

    /// `compose ps` per target, or the engine's `ps -a` with no target
    pub fn ps(&self, targets: &[String]) -> Result<()> {
        if targets.is_empty() {
            let cmd = self.runner.cli().engine(["ps", "-a"]);
            self.runner.stream(&cmd)?;
            return Ok(());
        }

        let resolved = self.resolve(&TargetRequest::with_targets(targets.iter().cloned()), Direction::Start)?;
        for (category, file) in resolved.entries() {
            let path = self.paths.resolve(file.file_name(), category);
            if !path.found {
                println!("❌ {}: expected at {}", file.service_name(), path.path.display());
                continue;
            }
            let cmd = self.runner.cli().compose(&path.path, ["ps"]);
            self.runner.stream(&cmd)?;
        }
        Ok(())
    }

    /// Plans, prints and (after confirmation where needed) executes cleanup
    pub fn cleanup(&self, options: &CleanupOptions, confirmation: &dyn Confirmation) -> Result<CleanupPlan> {
        let mut options = options.clone();
        options.preserve_data |= self.preserve_data;

        if options.is_empty() {
            println!("⚠️  Nenhuma opção de limpeza informada. Veja 'devarch prune-components --help'.");
            return Ok(CleanupPlan {
                options,
                candidates: Vec::new(),
            });
        }

        let planner = CleanupPlanner::new(
            self.runner.clone(),
            self.registry.clone(),
            self.paths.clone(),
            &self.network,
        );
        let plan = planner.plan(&options)?;
        plan.print();

        let done = planner.execute(plan, confirmation)?;
        if !self.runner.is_dry_run() {
            done.print_summary();
        }
        Ok(done)
    }
}
