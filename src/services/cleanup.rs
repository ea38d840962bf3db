use crate::domain::{
    CandidateAction, CleanupCandidate, CleanupCriterion, CleanupOptions, Confirmation, Direction,
    EngineKind, ResourceKind, ServiceRegistry,
};
use crate::infra::PathResolver;
use crate::services::is_compose_managed;
use crate::services::{CommandRunner, ContainerService, SystemService, TargetResolver};
use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phrase the user has to type before any volume is removed
pub const DELETE_CONFIRMATION_PHRASE: &str = "DELETE ALL DATA";

const PRESERVE_REASON: &str = "dados preservados (preserve_data/preserve_volumes)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    pub options: CleanupOptions,
    pub candidates: Vec<CleanupCandidate>,
}

impl CleanupPlan {
    fn count(&self, pred: impl Fn(&CandidateAction) -> bool) -> usize {
        self.candidates.iter().filter(|c| pred(&c.action)).count()
    }

    pub fn planned(&self) -> usize {
        self.count(|a| matches!(a, CandidateAction::Planned))
    }

    pub fn removed(&self) -> usize {
        self.count(|a| matches!(a, CandidateAction::Removed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, CandidateAction::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|a| matches!(a, CandidateAction::Failed { .. }))
    }

    /// True when executing the plan would delete volume data
    pub fn removes_volumes(&self) -> bool {
        self.candidates.iter().any(|c| {
            c.kind == ResourceKind::Volume && matches!(c.action, CandidateAction::Planned)
        })
    }

    pub fn print(&self) {
        if self.candidates.is_empty() {
            println!("✨ Nada a limpar.");
            return;
        }

        println!("🧹 Plano de limpeza:");
        for candidate in &self.candidates {
            let id = if candidate.is_approximate() {
                "(prune)"
            } else {
                candidate.id.as_str()
            };
            let marker = match &candidate.action {
                CandidateAction::Planned => "🗑️ ",
                CandidateAction::Removed => "✅",
                CandidateAction::Skipped { .. } => "⏭️ ",
                CandidateAction::Failed { .. } => "❌",
            };
            let note = match &candidate.action {
                CandidateAction::Skipped { reason } | CandidateAction::Failed { reason } => {
                    format!(" [{reason}]")
                }
                _ => String::new(),
            };
            println!(
                "  {marker} {:<9} {id}: {}{note}",
                candidate.kind, candidate.criterion
            );
        }
    }

    pub fn print_summary(&self) {
        println!();
        println!(
            "📊 Limpeza: {} removido(s), {} ignorado(s), {} falha(s)",
            self.removed(),
            self.skipped(),
            self.failed()
        );
        if self.candidates.iter().any(CleanupCandidate::is_approximate) {
            println!("ℹ️  Etapas de prune não informam contagem exata (*)");
        }
    }
}

/// Plans and executes engine resource removal.
///
/// Volume protection (`preserve_data`/`preserve_volumes`) is checked before
/// any other volume criterion and turns every volume candidate into a
/// skipped entry.
pub struct CleanupPlanner {
    runner: Arc<CommandRunner>,
    containers: ContainerService,
    system: SystemService,
    registry: Arc<ServiceRegistry>,
    paths: PathResolver,
    network: String,
}

impl CleanupPlanner {
    pub fn new(
        runner: Arc<CommandRunner>,
        registry: Arc<ServiceRegistry>,
        paths: PathResolver,
        network: &str,
    ) -> Self {
        Self {
            containers: ContainerService::new(runner.clone()),
            system: SystemService::new(runner.clone()),
            runner,
            registry,
            paths,
            network: network.to_string(),
        }
    }

    pub fn plan(&self, options: &CleanupOptions) -> Result<CleanupPlan> {
        let mut candidates = Vec::new();
        let protected = options.volumes_protected();

        let age = options
            .older_than_days
            .map(|days| CleanupCriterion::OlderThan { days });
        let prune_criterion = |full: bool| {
            if full {
                Some(CleanupCriterion::Unused)
            } else {
                age.clone()
            }
        };

        if let Some(criterion) = prune_criterion(options.remove_containers) {
            candidates.push(CleanupCandidate::planned(ResourceKind::Container, "*", criterion));
        }

        if let Some(criterion) = prune_criterion(options.remove_images) {
            candidates.push(CleanupCandidate::planned(ResourceKind::Image, "*", criterion));
        }

        // Age alone never reaches volumes: data goes only with --remove-volumes
        if options.remove_volumes {
            let criterion = age.clone().unwrap_or(CleanupCriterion::Unused);
            if protected {
                candidates.push(CleanupCandidate::skipped(
                    ResourceKind::Volume,
                    "*",
                    criterion,
                    PRESERVE_REASON,
                ));
            } else if age.is_some() && self.runner.cli().kind == EngineKind::Docker {
                candidates.push(CleanupCandidate::skipped(
                    ResourceKind::Volume,
                    "*",
                    criterion,
                    "docker volume prune não aceita filtro until",
                ));
            } else {
                candidates.push(CleanupCandidate::planned(ResourceKind::Volume, "*", criterion));
            }
        }

        if options.remove_networks {
            candidates.push(CleanupCandidate::planned(
                ResourceKind::Network,
                "*",
                CleanupCriterion::Unused,
            ));
        }

        if options.cleanup_large_volumes {
            if protected {
                candidates.push(CleanupCandidate::skipped(
                    ResourceKind::Volume,
                    "*",
                    CleanupCriterion::LargerThan {
                        size_mb: 0,
                        limit_mb: options.max_volume_size_mb,
                    },
                    PRESERVE_REASON,
                ));
            } else {
                candidates.extend(self.large_volumes(options)?);
            }
        }

        if options.cleanup_orphans {
            candidates.extend(self.orphan_containers()?);
        }

        if options.cleanup_service_volumes {
            candidates.extend(self.service_volumes(options)?);
        }

        Ok(CleanupPlan {
            options: options.clone(),
            candidates,
        })
    }

    fn large_volumes(&self, options: &CleanupOptions) -> Result<Vec<CleanupCandidate>> {
        let limit_mb = options.max_volume_size_mb;
        let mut oversized = Vec::new();
        let mut skipped = Vec::new();

        for volume in self.system.volumes(true)? {
            let users = self.system.volume_users(&volume)?;
            if !users.is_empty() {
                debug!("Volume {volume} em uso por {}", users.join(", "));
                skipped.push(CleanupCandidate::skipped(
                    ResourceKind::Volume,
                    volume,
                    CleanupCriterion::LargerThan {
                        size_mb: 0,
                        limit_mb,
                    },
                    format!("em uso por {}", users.join(", ")),
                ));
                continue;
            }

            let Some(mountpoint) = self.system.volume_mountpoint(&volume)? else {
                debug!("Volume {volume} sem mountpoint, ignorado");
                continue;
            };

            match self.system.disk_usage_mb(&mountpoint)? {
                Some(size_mb) if size_mb > limit_mb => oversized.push((volume, size_mb)),
                Some(_) => {}
                None => warn!("⚠️  Não foi possível medir o volume {volume}"),
            }
        }

        oversized.sort_by(|a, b| b.1.cmp(&a.1));

        let mut candidates: Vec<_> = oversized
            .into_iter()
            .enumerate()
            .map(|(pos, (volume, size_mb))| {
                let criterion = CleanupCriterion::LargerThan { size_mb, limit_mb };
                if pos < options.max_volumes_to_remove {
                    CleanupCandidate::planned(ResourceKind::Volume, volume, criterion)
                } else {
                    CleanupCandidate::skipped(
                        ResourceKind::Volume,
                        volume,
                        criterion,
                        format!("limite de {} volume(s) por execução", options.max_volumes_to_remove),
                    )
                }
            })
            .collect();

        candidates.extend(skipped);
        Ok(candidates)
    }

    /// One candidate per targeted service; resolution is local, so a vetoed
    /// run touches no engine state
    fn service_volumes(&self, options: &CleanupOptions) -> Result<Vec<CleanupCandidate>> {
        let request = &options.targets;
        if request.targets.is_empty() && request.categories.is_none() && request.services.is_none() {
            bail!("--cleanup-service-volumes exige serviços ou categorias alvo");
        }

        let resolved = TargetResolver::new(&self.registry).resolve(request, Direction::Stop)?;
        let protected = options.volumes_protected();

        let candidates = resolved
            .entries()
            .map(|(category, file)| {
                let compose = self.paths.resolve(file.file_name(), category);
                let criterion = CleanupCriterion::ServiceVolumes {
                    compose_file: compose.path.clone(),
                };
                let service = file.service_name();

                if protected {
                    CleanupCandidate::skipped(ResourceKind::Volume, service, criterion, PRESERVE_REASON)
                } else if !compose.found {
                    CleanupCandidate::skipped(
                        ResourceKind::Volume,
                        service,
                        criterion,
                        format!("arquivo compose ausente (expected at {})", compose.path.display()),
                    )
                } else {
                    CleanupCandidate::planned(ResourceKind::Volume, service, criterion)
                }
            })
            .collect();

        Ok(candidates)
    }

    /// Containers unknown to the registry, off the managed network and
    /// without a compose project label
    fn orphan_containers(&self) -> Result<Vec<CleanupCandidate>> {
        let mut candidates = Vec::new();

        for name in self.containers.list_containers()? {
            if self.registry.contains_service(&name) {
                continue;
            }
            if self.containers.networks(&name)?.contains(&self.network) {
                continue;
            }
            if is_compose_managed(&self.containers.labels(&name)?) {
                continue;
            }

            candidates.push(CleanupCandidate::planned(
                ResourceKind::Container,
                name,
                CleanupCriterion::Orphaned,
            ));
        }

        Ok(candidates)
    }

    /// Runs every planned candidate. Volume removal needs the typed
    /// confirmation first; a refusal aborts before any command is issued.
    pub fn execute(&self, mut plan: CleanupPlan, confirmation: &dyn Confirmation) -> Result<CleanupPlan> {
        if plan.removes_volumes() && !self.runner.is_dry_run() {
            let prompt = "Esta operação remove volumes e TODOS os dados neles.";
            if !confirmation.confirm(prompt, DELETE_CONFIRMATION_PHRASE)? {
                bail!("Remoção de volumes cancelada: confirmação não recebida");
            }
        }

        info!("🧹 Executando limpeza...");

        for candidate in plan.candidates.iter_mut() {
            if candidate.action != CandidateAction::Planned {
                continue;
            }

            let result = self.remove(candidate);
            if self.runner.is_dry_run() {
                continue;
            }

            candidate.action = match result {
                Ok(true) => CandidateAction::Removed,
                Ok(false) => CandidateAction::Failed {
                    reason: "engine retornou erro".to_string(),
                },
                Err(e) => CandidateAction::Failed {
                    reason: format!("{e:#}"),
                },
            };
        }

        Ok(plan)
    }

    fn remove(&self, candidate: &CleanupCandidate) -> Result<bool> {
        let days = match &candidate.criterion {
            CleanupCriterion::OlderThan { days } => Some(*days),
            CleanupCriterion::ServiceVolumes { compose_file } => {
                let cmd = self.runner.cli().compose(compose_file, ["down", "-v"]);
                return Ok(self.runner.execute(&cmd)?.success);
            }
            _ => None,
        };

        match (candidate.kind, candidate.is_approximate()) {
            (ResourceKind::Container, true) => self.system.prune_containers(days),
            (ResourceKind::Image, true) => self.system.prune_images(days),
            (ResourceKind::Volume, true) => self.system.prune_volumes(days),
            (ResourceKind::Network, _) => self.system.prune_networks(),
            (ResourceKind::Volume, false) => self.system.remove_volume(&candidate.id),
            (ResourceKind::Container, false) => self.containers.remove(&candidate.id),
            (ResourceKind::Image, false) => {
                bail!("remoção individual de imagem não suportada: {}", candidate.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComposeFlavor, EngineCli, ServiceCategory, TargetRequest};
    use crate::infra::PathOverrides;
    use crate::test_support::{MockEngine, RecordingConfirmation};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn planner(mock: Arc<MockEngine>, dry_run: bool) -> (CleanupPlanner, Arc<CommandRunner>) {
        planner_for(mock, EngineKind::Podman, dry_run, Path::new("/srv/compose"))
    }

    fn planner_for(
        mock: Arc<MockEngine>,
        kind: EngineKind,
        dry_run: bool,
        compose_dir: &Path,
    ) -> (CleanupPlanner, Arc<CommandRunner>) {
        let cli = EngineCli::new(kind, ComposeFlavor::Plugin, false);
        let runner = Arc::new(CommandRunner::new(mock, cli, dry_run));
        let registry = ServiceRegistry::new(vec![
            ServiceCategory::new("database", ["postgres.yml", "redis.yml"]),
            ServiceCategory::new("backend", ["php.yml"]),
        ])
        .unwrap();
        let paths = PathResolver::new(compose_dir, PathOverrides::default());
        (
            CleanupPlanner::new(runner.clone(), Arc::new(registry), paths, "microservices-net"),
            runner,
        )
    }

    fn compose_tree(root: &Path) {
        for (category, file) in [
            ("database", "postgres.yml"),
            ("database", "redis.yml"),
            ("backend", "php.yml"),
        ] {
            fs::create_dir_all(root.join(category)).unwrap();
            fs::write(root.join(category).join(file), "services: {}\n").unwrap();
        }
    }

    fn is_volume_removal(cmd: &str) -> bool {
        cmd.contains("volume prune") || cmd.contains("volume rm") || cmd.contains(" -v")
    }

    #[test]
    fn preserve_data_never_issues_volume_removal() {
        let dir = TempDir::new().unwrap();
        compose_tree(dir.path());

        let flags = [false, true];
        let selections = [
            TargetRequest::with_targets(["database"]),
            TargetRequest::with_targets(["php", "redis"]),
            TargetRequest {
                categories: Some(vec!["database".into()]),
                services: Some(vec!["postgres".into()]),
                ..Default::default()
            },
        ];

        for remove_volumes in flags {
            for large in flags {
                for age in [None, Some(7)] {
                    for preserve_volumes in flags {
                        for service_volumes in flags {
                            for targets in &selections {
                                let mock = Arc::new(MockEngine::new());
                                mock.respond("dangling=true", "big\n");
                                mock.respond("{{.Mountpoint}}", "/v/big\n");
                                mock.respond("du -sm", "4096\t/v/big\n");
                                let (planner, runner) =
                                    planner_for(mock.clone(), EngineKind::Podman, true, dir.path());

                                let options = CleanupOptions {
                                    remove_volumes,
                                    cleanup_large_volumes: large,
                                    older_than_days: age,
                                    remove_images: true,
                                    cleanup_service_volumes: service_volumes,
                                    targets: targets.clone(),
                                    preserve_data: !preserve_volumes,
                                    preserve_volumes,
                                    ..CleanupOptions::none()
                                };

                                let plan = planner.plan(&options).unwrap();
                                assert!(!plan.removes_volumes());
                                planner
                                    .execute(plan, &RecordingConfirmation::new(true))
                                    .unwrap();

                                assert!(
                                    !runner.planned().iter().any(|c| is_volume_removal(c)),
                                    "volume removal planned for {options:?}"
                                );
                                assert!(mock.get_runs().is_empty());
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn preserve_veto_is_recorded_as_skipped() {
        let mock = Arc::new(MockEngine::new());
        let (planner, _) = planner(mock.clone(), false);
        let options = CleanupOptions {
            remove_volumes: true,
            cleanup_large_volumes: true,
            preserve_data: true,
            ..CleanupOptions::none()
        };

        let plan = planner.plan(&options).unwrap();
        assert_eq!(plan.skipped(), 2);
        assert_eq!(plan.planned(), 0);
        assert!(!mock.get_commands().iter().any(|c| c.contains("volume")));
    }

    #[test]
    fn age_cleanup_leaves_volumes_alone() {
        let mock = Arc::new(MockEngine::new());
        let (planner, runner) = planner(mock, true);
        let options = CleanupOptions {
            older_than_days: Some(3),
            ..CleanupOptions::none()
        };
        let confirmation = RecordingConfirmation::new(false);

        let plan = planner.plan(&options).unwrap();
        assert!(!plan.removes_volumes());
        planner.execute(plan, &confirmation).unwrap();

        assert!(confirmation.prompts().is_empty());
        assert_eq!(
            runner.planned(),
            vec![
                "podman container prune -f --filter until=72h".to_string(),
                "podman image prune -af --filter until=72h".to_string(),
            ]
        );
    }

    #[test]
    fn age_limited_volume_prune_needs_remove_volumes() {
        let mock = Arc::new(MockEngine::new());
        let (planner, runner) = planner(mock, true);
        let options = CleanupOptions {
            older_than_days: Some(3),
            remove_volumes: true,
            ..CleanupOptions::none()
        };

        let plan = planner.plan(&options).unwrap();
        assert!(plan.removes_volumes());
        planner.execute(plan, &RecordingConfirmation::new(false)).unwrap();

        assert_eq!(
            runner.planned(),
            vec!["podman volume prune -f --filter until=72h".to_string()]
        );
    }

    #[test]
    fn docker_age_volume_prune_is_skipped() {
        let mock = Arc::new(MockEngine::new());
        let (planner, runner) = planner_for(mock, EngineKind::Docker, true, Path::new("/srv/compose"));
        let options = CleanupOptions {
            older_than_days: Some(3),
            remove_volumes: true,
            ..CleanupOptions::none()
        };

        let plan = planner.plan(&options).unwrap();
        assert_eq!(plan.skipped(), 1);
        assert!(!plan.removes_volumes());
        planner.execute(plan, &RecordingConfirmation::new(false)).unwrap();

        assert!(runner.planned().is_empty());
    }

    #[test]
    fn service_volumes_follow_stop_order() {
        let dir = TempDir::new().unwrap();
        compose_tree(dir.path());
        let mock = Arc::new(MockEngine::new());
        let (planner, _) = planner_for(mock.clone(), EngineKind::Podman, false, dir.path());
        let options = CleanupOptions {
            cleanup_service_volumes: true,
            targets: TargetRequest {
                except_services: vec!["redis".into()],
                ..TargetRequest::with_targets(["database", "backend"])
            },
            ..CleanupOptions::none()
        };
        let confirmation = RecordingConfirmation::new(true);

        let plan = planner.plan(&options).unwrap();
        let ids: Vec<_> = plan.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["php", "postgres"]);
        assert!(plan.removes_volumes());

        let done = planner.execute(plan, &confirmation).unwrap();
        assert_eq!(done.removed(), 2);
        assert_eq!(confirmation.prompts().len(), 1);
        let runs = mock.get_runs();
        assert!(runs[0].ends_with("backend/php.yml down -v"), "{runs:?}");
        assert!(runs[1].ends_with("database/postgres.yml down -v"), "{runs:?}");
    }

    #[test]
    fn service_volumes_refused_runs_nothing() {
        let dir = TempDir::new().unwrap();
        compose_tree(dir.path());
        let mock = Arc::new(MockEngine::new());
        let (planner, _) = planner_for(mock.clone(), EngineKind::Podman, false, dir.path());
        let options = CleanupOptions {
            cleanup_service_volumes: true,
            targets: TargetRequest::with_targets(["postgres"]),
            ..CleanupOptions::none()
        };

        let plan = planner.plan(&options).unwrap();
        assert!(planner.execute(plan, &RecordingConfirmation::new(false)).is_err());
        assert!(mock.get_commands().is_empty());
    }

    #[test]
    fn service_volumes_need_targets_and_files() {
        let mock = Arc::new(MockEngine::new());
        let (planner, _) = planner(mock, false);

        let untargeted = CleanupOptions {
            cleanup_service_volumes: true,
            ..CleanupOptions::none()
        };
        assert!(planner.plan(&untargeted).is_err());

        let missing = CleanupOptions {
            cleanup_service_volumes: true,
            targets: TargetRequest::with_targets(["php"]),
            ..CleanupOptions::none()
        };
        let plan = planner.plan(&missing).unwrap();
        assert_eq!(plan.skipped(), 1);
        assert!(!plan.removes_volumes());
    }

    #[test]
    fn large_volumes_sorted_and_capped() {
        let mock = Arc::new(MockEngine::new());
        mock.respond("dangling=true", "small\nhuge\nbig\nused\n");
        mock.respond("volume=used", "app\n");
        mock.respond("{{.Mountpoint}} small", "/v/small\n");
        mock.respond("{{.Mountpoint}} huge", "/v/huge\n");
        mock.respond("{{.Mountpoint}} big", "/v/big\n");
        mock.respond("du -sm /v/small", "10\t/v/small\n");
        mock.respond("du -sm /v/huge", "9000\t/v/huge\n");
        mock.respond("du -sm /v/big", "2000\t/v/big\n");
        let (planner, _) = planner(mock, false);

        let options = CleanupOptions {
            cleanup_large_volumes: true,
            max_volumes_to_remove: 1,
            ..CleanupOptions::none()
        };
        let plan = planner.plan(&options).unwrap();

        let planned: Vec<_> = plan
            .candidates
            .iter()
            .filter(|c| c.action == CandidateAction::Planned)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(planned, vec!["huge"]);
        assert!(plan.candidates.iter().any(|c| c.id == "big" && c.action != CandidateAction::Planned));
        assert!(plan.candidates.iter().any(|c| c.id == "used"));
        assert!(!plan.candidates.iter().any(|c| c.id == "small"));
    }

    #[test]
    fn volume_removal_requires_confirmation() {
        let mock = Arc::new(MockEngine::new());
        let (planner, _) = planner(mock.clone(), false);
        let options = CleanupOptions {
            remove_volumes: true,
            ..CleanupOptions::none()
        };
        let confirmation = RecordingConfirmation::new(false);

        let plan = planner.plan(&options).unwrap();
        let err = planner.execute(plan, &confirmation).unwrap_err();

        assert!(err.to_string().contains("cancelada"));
        assert_eq!(confirmation.prompts().len(), 1);
        assert!(mock.get_runs().is_empty());
    }

    #[test]
    fn confirmed_volume_prune_runs() {
        let mock = Arc::new(MockEngine::new());
        let (planner, _) = planner(mock.clone(), false);
        let options = CleanupOptions {
            remove_volumes: true,
            ..CleanupOptions::none()
        };

        let plan = planner.plan(&options).unwrap();
        let done = planner
            .execute(plan, &RecordingConfirmation::new(true))
            .unwrap();

        assert_eq!(done.removed(), 1);
        assert!(mock.ran("podman volume prune -f"));
    }

    #[test]
    fn orphans_exclude_registry_network_and_compose() {
        let mock = Arc::new(MockEngine::new());
        mock.respond("ps -a --format {{.Names}}", "postgres\nnet-member\ncomposed\nstray\n");
        mock.respond(
            "Networks}}' net-member",
            r#"{"microservices-net":{}}"#,
        );
        mock.respond(
            "Labels}}' composed",
            r#"{"io.podman.compose.project":"x"}"#,
        );
        let (planner, _) = planner(mock.clone(), false);

        let options = CleanupOptions {
            cleanup_orphans: true,
            ..CleanupOptions::none()
        };
        let plan = planner.plan(&options).unwrap();

        let ids: Vec<_> = plan.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["stray"]);

        let done = planner
            .execute(plan, &RecordingConfirmation::new(false))
            .unwrap();
        assert_eq!(done.removed(), 1);
        assert!(mock.ran("podman rm -f stray"));
    }

    #[test]
    fn failed_prune_is_reported() {
        let mock = Arc::new(MockEngine::new());
        mock.fail_on("image prune");
        let (planner, _) = planner(mock, false);
        let options = CleanupOptions {
            remove_images: true,
            remove_networks: true,
            ..CleanupOptions::none()
        };

        let plan = planner.plan(&options).unwrap();
        let done = planner
            .execute(plan, &RecordingConfirmation::new(false))
            .unwrap();

        assert_eq!(done.failed(), 1);
        assert_eq!(done.removed(), 1);
    }
}
