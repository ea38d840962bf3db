mod actions;
mod cleanup;
mod container_service;
mod executor;
mod health;
mod orchestrator;
mod runner;
mod system_service;
mod target_resolver;

pub use actions::{Action, ActionOutcome, DEFAULT_STOP_TIMEOUT_SECS};
pub use cleanup::{CleanupPlan, CleanupPlanner, DELETE_CONFIRMATION_PHRASE};
pub use container_service::{COMPOSE_PROJECT_LABELS, ContainerService, is_compose_managed};
pub use executor::{BulkExecutor, BulkOptions, BulkReport};
pub use health::{HealthOutcome, HealthWaiter};
pub use orchestrator::Orchestrator;
pub use runner::CommandRunner;
pub use system_service::SystemService;
pub use target_resolver::TargetResolver;
