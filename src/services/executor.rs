use crate::domain::{Direction, OperationTarget, ResolvedTargets, ServiceFileRef};
use crate::infra::PathResolver;
use crate::services::{Action, ActionOutcome, CommandRunner, HealthOutcome, HealthWaiter};
use anyhow::{Result, anyhow};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOptions {
    /// Run the services of one category concurrently
    pub parallel: bool,
    pub wait_healthy: bool,
    pub health_timeout: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            wait_healthy: true,
            health_timeout: Duration::from_secs(crate::infra::config::DEFAULT_HEALTH_TIMEOUT_SECS),
        }
    }
}

/// Counters of one bulk run; exit code is non-zero if anything failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: usize,
    pub already_done: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Started but never reported healthy
    pub unhealthy: usize,
    pub failures: Vec<String>,
}

impl BulkReport {
    pub fn record(&mut self, service: &str, result: Result<ActionOutcome>) {
        match result {
            Ok(ActionOutcome::Success) => {
                println!("  ✅ {service}");
                self.succeeded += 1;
            }
            Ok(ActionOutcome::AlreadyDone(note)) => {
                println!("  ⚠️  {service}: {note}");
                self.already_done += 1;
            }
            Ok(ActionOutcome::Failed(reason)) => {
                println!("  ❌ {service}: {reason}");
                self.failed += 1;
                self.failures.push(format!("{service}: {reason}"));
            }
            Err(e) => {
                println!("  ❌ {service}: {e:#}");
                self.failed += 1;
                self.failures.push(format!("{service}: {e:#}"));
            }
        }
    }

    fn record_health(&mut self, service: &str, outcome: HealthOutcome) {
        if !outcome.is_ready() {
            self.unhealthy += 1;
            self.failures.push(format!("{service}: {outcome}"));
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.unhealthy == 0
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn print_summary(&self) {
        println!();
        println!(
            "📊 Resumo: {} ok, {} já no estado, {} falha(s), {} ignorado(s)",
            self.succeeded, self.already_done, self.failed, self.skipped
        );
        if self.unhealthy > 0 {
            println!("⚠️  {} serviço(s) não ficaram saudáveis", self.unhealthy);
        }
        for failure in &self.failures {
            println!("   ❌ {failure}");
        }
    }
}

/// Applies one action across resolved targets: bare services first, then
/// categories in resolved order. A failure never aborts the siblings.
pub struct BulkExecutor<'a> {
    runner: &'a CommandRunner,
    paths: &'a PathResolver,
    health: Option<&'a HealthWaiter>,
}

impl<'a> BulkExecutor<'a> {
    pub fn new(runner: &'a CommandRunner, paths: &'a PathResolver) -> Self {
        Self {
            runner,
            paths,
            health: None,
        }
    }

    pub fn with_health(mut self, health: &'a HealthWaiter) -> Self {
        self.health = Some(health);
        self
    }

    pub fn run(&self, targets: &ResolvedTargets, action: &Action, options: &BulkOptions) -> BulkReport {
        let mut report = BulkReport {
            skipped: targets.skipped.len(),
            ..Default::default()
        };

        if !targets.services.is_empty() {
            info!("🔧 {action}: serviços avulsos");
            let batch: Vec<_> = targets
                .services
                .iter()
                .map(|s| self.target(&s.category, &s.file))
                .collect();
            self.run_batch(&batch, action, options, targets.direction, &mut report);
        }

        for category in &targets.categories {
            info!("📂 {action}: categoria {}", category.name);
            let batch: Vec<_> = category
                .services
                .iter()
                .map(|file| self.target(&category.name, file))
                .collect();
            self.run_batch(&batch, action, options, targets.direction, &mut report);
        }

        report
    }

    fn target(&self, category: &str, file: &ServiceFileRef) -> OperationTarget {
        let resolved = self.paths.resolve(file.file_name(), category);
        OperationTarget::new(category, file, resolved)
    }

    fn run_batch(
        &self,
        batch: &[OperationTarget],
        action: &Action,
        options: &BulkOptions,
        direction: Direction,
        report: &mut BulkReport,
    ) {
        let results = if options.parallel && batch.len() > 1 {
            self.execute_parallel(batch, action)
        } else {
            batch
                .iter()
                .map(|target| action.execute(target, self.runner))
                .collect()
        };

        let mut started = Vec::new();
        for (target, result) in batch.iter().zip(results) {
            if matches!(result, Ok(ActionOutcome::Success)) {
                started.push(target.service.as_str());
            }
            report.record(&target.service, result);
        }

        if direction == Direction::Start && action.starts_containers() && options.wait_healthy {
            self.wait_for(&started, options.health_timeout, report);
        }
    }

    fn execute_parallel(&self, batch: &[OperationTarget], action: &Action) -> Vec<Result<ActionOutcome>> {
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|target| scope.spawn(move || action.execute(target, self.runner)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(anyhow!("thread de execução abortou")))
                })
                .collect()
        })
    }

    fn wait_for(&self, services: &[&str], timeout: Duration, report: &mut BulkReport) {
        let Some(health) = self.health else {
            return;
        };

        if self.runner.is_dry_run() {
            debug!("dry-run: espera de saúde ignorada");
            return;
        }

        for service in services {
            match health.wait_healthy(service, timeout) {
                Ok(outcome) => report.record_health(service, outcome),
                Err(e) => {
                    warn!("Erro ao verificar saúde de {service}: {e:#}");
                    report.record_health(service, HealthOutcome::TimedOut);
                }
            }
        }
    }
}
